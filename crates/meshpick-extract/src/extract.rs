//! Merging primitive groups into one triangle soup.

use log::warn;
use meshpick_math::Point3;

use crate::geometry::MeshGeometry;
use crate::source::{PrimitiveSource, Topology};

/// Merge every triangle-list primitive into a single [`MeshGeometry`].
///
/// Primitives with another topology, or without positions, are skipped.
/// Positions with 1 or 2 components are padded with zeros and a fourth
/// component is dropped. Vertices that cannot be read are dropped; the
/// primitive's indices are remapped onto the surviving vertices and
/// triangles that touched a dropped vertex are discarded, as are
/// triangles with an index past the primitive's vertex count. Local
/// bounds are left unset.
pub fn extract_mesh<P: PrimitiveSource>(primitives: impl IntoIterator<Item = P>) -> MeshGeometry {
    let mut mesh = MeshGeometry::default();

    for (prim_idx, prim) in primitives.into_iter().enumerate() {
        let topology = prim.topology();
        if topology != Topology::Triangles {
            warn!("skipping primitive {prim_idx}: unsupported topology {topology:?}");
            continue;
        }
        let layout = match prim.position_layout() {
            Some(layout) if layout.count > 0 => layout,
            _ => {
                warn!("skipping primitive {prim_idx}: no positions");
                continue;
            }
        };
        let components = match layout.components {
            c @ 1..=4 => c,
            _ => 3,
        };
        let count = layout.count;
        let base_vertex = mesh.positions.len() as u32;

        let mut scratch = vec![0.0_f32; count * components];
        let written = prim.unpack_positions(&mut scratch);

        // Local vertex -> merged vertex, only needed once a vertex is dropped.
        let mut remap: Option<Vec<Option<u32>>> = None;

        if written == scratch.len() {
            mesh.positions
                .extend(scratch.chunks_exact(components).map(to_point));
        } else {
            let mut element = [0.0_f32; 4];
            let mut slots = Vec::with_capacity(count);
            for i in 0..count {
                if prim.read_position(i, &mut element[..components]) {
                    slots.push(Some(mesh.positions.len() as u32));
                    mesh.positions.push(to_point(&element[..components]));
                } else {
                    slots.push(None);
                }
            }
            let emitted = mesh.positions.len() - base_vertex as usize;
            if emitted < count {
                warn!(
                    "primitive {prim_idx}: dropped {} of {count} unreadable vertices",
                    count - emitted
                );
                remap = Some(slots);
            }
        }

        let resolve = |local: u32| -> Option<u32> {
            match &remap {
                Some(slots) => slots.get(local as usize).copied().flatten(),
                None => ((local as usize) < count).then(|| local + base_vertex),
            }
        };

        let local_indices: Vec<u32> = match prim.index_count() {
            0 => (0..count as u32).collect(),
            n => (0..n).map(|i| prim.read_index(i)).collect(),
        };

        let mut discarded = 0usize;
        for tri in local_indices.chunks_exact(3) {
            match (resolve(tri[0]), resolve(tri[1]), resolve(tri[2])) {
                (Some(a), Some(b), Some(c)) => mesh.indices.extend_from_slice(&[a, b, c]),
                _ => discarded += 1,
            }
        }
        if discarded > 0 {
            warn!("primitive {prim_idx}: discarded {discarded} triangles with unresolved vertices");
        }
    }

    mesh
}

fn to_point(element: &[f32]) -> Point3 {
    Point3::new(
        element[0],
        element.get(1).copied().unwrap_or(0.0),
        element.get(2).copied().unwrap_or(0.0),
    )
}
