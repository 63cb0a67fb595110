//! glTF loading: mesh primitives as [`PrimitiveSource`] and scene walking.

use std::collections::HashMap;
use std::path::Path;

use gltf::mesh::Mode;
use log::debug;
use meshpick_math::Transform;

use crate::error::{ExtractError, Result};
use crate::extract::extract_mesh;
use crate::geometry::MeshGeometry;
use crate::source::{PositionLayout, PrimitiveSource, Topology};

/// A glTF primitive with its accessors decoded up front.
#[derive(Debug, Clone)]
pub struct GltfPrimitive {
    topology: Topology,
    position_count: Option<usize>,
    positions: Vec<[f32; 3]>,
    indices: Option<Vec<u32>>,
}

impl GltfPrimitive {
    /// Decode a primitive's positions and indices from loaded buffers.
    pub fn new(primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> Self {
        let topology = match primitive.mode() {
            Mode::Points => Topology::Points,
            Mode::Lines => Topology::Lines,
            Mode::LineLoop => Topology::LineLoop,
            Mode::LineStrip => Topology::LineStrip,
            Mode::Triangles => Topology::Triangles,
            Mode::TriangleStrip => Topology::TriangleStrip,
            Mode::TriangleFan => Topology::TriangleFan,
        };
        let position_count = primitive
            .get(&gltf::Semantic::Positions)
            .map(|accessor| accessor.count());

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let positions = reader
            .read_positions()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        let indices = reader
            .read_indices()
            .map(|read| read.into_u32().collect());

        Self {
            topology,
            position_count,
            positions,
            indices,
        }
    }
}

impl PrimitiveSource for GltfPrimitive {
    fn topology(&self) -> Topology {
        self.topology
    }

    fn position_layout(&self) -> Option<PositionLayout> {
        // POSITION is always VEC3 float in glTF 2.0.
        self.position_count.map(|count| PositionLayout {
            count,
            components: 3,
        })
    }

    fn unpack_positions(&self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for (dst, src) in out.chunks_exact_mut(3).zip(&self.positions) {
            dst.copy_from_slice(src);
            written += 3;
        }
        written
    }

    fn read_position(&self, index: usize, out: &mut [f32]) -> bool {
        match self.positions.get(index) {
            Some(p) => {
                let n = out.len().min(3);
                out[..n].copy_from_slice(&p[..n]);
                true
            }
            None => false,
        }
    }

    fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    fn read_index(&self, i: usize) -> u32 {
        self.indices.as_ref().map_or(0, |indices| indices[i])
    }
}

/// Merge all triangle primitives of a glTF mesh.
pub fn extract_gltf_mesh(mesh: &gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) -> MeshGeometry {
    extract_mesh(mesh.primitives().map(|p| GltfPrimitive::new(&p, buffers)))
}

/// A mesh-bearing node of a glTF scene.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    /// Index of the node in the document.
    pub node_index: usize,
    /// Node name, if any.
    pub name: Option<String>,
    /// Index of the referenced mesh in the document.
    pub mesh_index: usize,
    /// Local-space geometry of the mesh.
    pub geometry: MeshGeometry,
    /// Node world transform (parent transforms composed in).
    pub world: Transform,
}

/// Load a glTF/GLB file and collect its scene's mesh instances.
pub fn load_gltf_scene(path: impl AsRef<Path>) -> Result<Vec<MeshInstance>> {
    let (document, buffers, _images) = gltf::import(path)?;
    scene_instances(&document, &buffers)
}

/// Walk the default scene (or the first one) and collect mesh instances.
///
/// Meshes referenced by several nodes are extracted once and cloned.
pub fn scene_instances(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<MeshInstance>> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(ExtractError::NoScene)?;

    let mut extracted: HashMap<usize, MeshGeometry> = HashMap::new();
    let mut instances = Vec::new();
    let mut stack: Vec<(gltf::Node<'_>, Transform)> = scene
        .nodes()
        .map(|node| (node, Transform::identity()))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        let world = parent.then(&Transform::from_cols_array(&node.transform().matrix()));
        if let Some(mesh) = node.mesh() {
            let geometry = extracted
                .entry(mesh.index())
                .or_insert_with(|| extract_gltf_mesh(&mesh, buffers))
                .clone();
            debug!(
                "node {} uses mesh {}: {} vertices, {} triangles",
                node.index(),
                mesh.index(),
                geometry.num_vertices(),
                geometry.num_triangles()
            );
            instances.push(MeshInstance {
                node_index: node.index(),
                name: node.name().map(str::to_owned),
                mesh_index: mesh.index(),
                geometry,
                world,
            });
        }
        stack.extend(node.children().map(|child| (child, world)));
    }

    instances.sort_by_key(|instance| instance.node_index);
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpick_math::Point3;

    /// One triangle (indexed) plus a LINES primitive reusing its positions,
    /// on a child node translated (0, 0, 1) under a parent at (5, 0, 0).
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "translation": [5.0, 0.0, 0.0], "children": [1] },
            { "name": "tri", "mesh": 0, "translation": [0.0, 0.0, 1.0] }
        ],
        "meshes": [{
            "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 1 },
                { "attributes": { "POSITION": 0 }, "mode": 1 }
            ]
        }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
        }]
    }"#;

    #[test]
    fn test_primitive_adapter() {
        let (document, buffers, _) = gltf::import_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mesh = document.meshes().next().unwrap();
        let prims: Vec<GltfPrimitive> = mesh
            .primitives()
            .map(|p| GltfPrimitive::new(&p, &buffers))
            .collect();

        assert_eq!(prims[0].topology(), Topology::Triangles);
        assert_eq!(prims[0].index_count(), 3);
        assert_eq!(
            prims[0].position_layout(),
            Some(PositionLayout {
                count: 3,
                components: 3
            })
        );
        assert_eq!(prims[1].topology(), Topology::Lines);
        assert_eq!(prims[1].index_count(), 0);
    }

    #[test]
    fn test_extract_skips_line_primitive() {
        let (document, buffers, _) = gltf::import_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mesh = document.meshes().next().unwrap();
        let geometry = extract_gltf_mesh(&mesh, &buffers);
        assert_eq!(geometry.num_vertices(), 3);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.positions[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_scene_instances_compose_transforms() {
        let (document, buffers, _) = gltf::import_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let instances = scene_instances(&document, &buffers).unwrap();
        assert_eq!(instances.len(), 1);

        let instance = &instances[0];
        assert_eq!(instance.node_index, 1);
        assert_eq!(instance.name.as_deref(), Some("tri"));
        let p = instance.world.apply_point(&Point3::origin());
        assert!((p - Point3::new(5.0, 0.0, 1.0)).norm() < 1e-6);
    }
}
