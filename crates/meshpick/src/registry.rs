//! Entity registry and the closest-hit pick query.

use log::{debug, trace, warn};
use meshpick_extract::MeshGeometry;
use meshpick_math::{Aabb3, Point3, Transform, Vec3};
use meshpick_raytrace::{Bvh, Ray, TraversalStats};
use rustc_hash::FxHashMap;

use crate::entity::EntityId;
use crate::error::{PickError, Result};
use crate::hit::{Hit, PickStats};
use crate::screen::{screen_ray, CameraMatrices, Viewport};
use crate::settings::PickSettings;

/// Geometry and acceleration structure owned by the registry for one entity.
#[derive(Debug, Clone)]
pub struct MeshRecord {
    geometry: MeshGeometry,
    bvh: Bvh,
    built: bool,
}

impl MeshRecord {
    /// A record whose BVH will be built on demand.
    pub fn new(geometry: MeshGeometry) -> Self {
        Self {
            geometry,
            bvh: Bvh::default(),
            built: false,
        }
    }

    /// A record with a BVH already built over `geometry`.
    pub fn prebuilt(geometry: MeshGeometry, bvh: Bvh) -> Self {
        Self {
            geometry,
            bvh,
            built: true,
        }
    }

    /// Local-space geometry.
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// The BVH, once built.
    pub fn bvh(&self) -> Option<&Bvh> {
        self.built.then_some(&self.bvh)
    }

    /// Whether the BVH has been built.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Local bounds, computing them from the vertices if unset.
    pub fn local_bounds(&self) -> Aabb3 {
        self.geometry
            .local_bounds
            .unwrap_or_else(|| self.geometry.compute_bounds())
    }

    /// Build the BVH unless already built. Returns true if a build happened.
    ///
    /// A mesh without triangles ends up built with an empty tree.
    pub fn build(&mut self, leaf_size: usize) -> bool {
        if self.built {
            return false;
        }
        if self.geometry.num_triangles() > 0 {
            self.bvh = Bvh::build(&self.geometry.positions, &self.geometry.indices, leaf_size);
        }
        self.built = true;
        true
    }
}

/// Cached world transform with its inverse.
#[derive(Debug, Clone, Copy)]
struct CachedTransform {
    world: Transform,
    /// `None` when `world` is singular.
    world_to_local: Option<Transform>,
}

/// Ray mapped into an entity's local space.
struct LocalRay {
    ray: Ray,
    /// Local units per world unit along the ray.
    scale: f32,
}

/// Owns every pickable mesh and answers closest-hit ray queries.
///
/// The registry is not synchronized. [`PickingRegistry::pick`] may build
/// BVHs and therefore takes `&mut self`; callers that want to share a
/// registry across readers call [`PickingRegistry::build_all`] once and
/// then use [`PickingRegistry::pick_ready`].
#[derive(Debug, Default)]
pub struct PickingRegistry {
    meshes: FxHashMap<EntityId, MeshRecord>,
    transforms: FxHashMap<EntityId, CachedTransform>,
    settings: PickSettings,
}

impl PickingRegistry {
    /// Empty registry with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry with validated settings.
    pub fn with_settings(settings: PickSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    /// Active settings.
    pub fn settings(&self) -> &PickSettings {
        &self.settings
    }

    /// Register `geometry` for `entity`, replacing any previous record.
    ///
    /// Unset local bounds are computed from the vertices. The BVH is built
    /// lazily unless `eager_build` is set.
    pub fn register_mesh(&mut self, entity: EntityId, geometry: MeshGeometry) -> Option<MeshRecord> {
        self.register(entity, MeshRecord::new(geometry))
    }

    /// Register a record, replacing and returning any previous one.
    pub fn register(&mut self, entity: EntityId, mut record: MeshRecord) -> Option<MeshRecord> {
        if entity.is_none() {
            warn!("registering the sentinel entity {entity}; its hits read as misses");
        }
        record.geometry.ensure_bounds();
        if self.settings.eager_build {
            build_record(entity, &mut record, self.settings.leaf_size);
        }
        self.meshes.insert(entity, record)
    }

    /// Remove an entity's mesh and cached transform.
    pub fn unregister(&mut self, entity: EntityId) -> Option<MeshRecord> {
        self.transforms.remove(&entity);
        self.meshes.remove(&entity)
    }

    /// Record for `entity`, if registered.
    pub fn mesh(&self, entity: EntityId) -> Option<&MeshRecord> {
        self.meshes.get(&entity)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Registered entity ids, in unspecified order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.meshes.keys().copied()
    }

    /// Set the local-to-world transform for `entity`.
    ///
    /// The entity does not have to be registered. Entities without a
    /// transform are treated as identity.
    pub fn set_world_transform(&mut self, entity: EntityId, world: Transform) {
        let world_to_local = world.inverse();
        if world_to_local.is_none() {
            debug!("world transform of entity {entity} is singular; it will not be picked");
        }
        self.transforms.insert(
            entity,
            CachedTransform {
                world,
                world_to_local,
            },
        );
    }

    /// Cached world transform for `entity`, if one was set.
    pub fn world_transform(&self, entity: EntityId) -> Option<&Transform> {
        self.transforms.get(&entity).map(|cached| &cached.world)
    }

    /// Build the BVH for `entity` if it exists and is not built yet.
    pub fn build_if_needed(&mut self, entity: EntityId) {
        let leaf_size = self.settings.leaf_size;
        if let Some(record) = self.meshes.get_mut(&entity) {
            build_record(entity, record, leaf_size);
        }
    }

    /// Build every unbuilt BVH.
    pub fn build_all(&mut self) {
        let leaf_size = self.settings.leaf_size;
        for (&entity, record) in self.meshes.iter_mut() {
            build_record(entity, record, leaf_size);
        }
    }

    /// Closest hit along a world-space ray, building BVHs as needed.
    ///
    /// `direction` need not be normalized. Returns [`Hit::none`] if the
    /// ray hits nothing.
    pub fn pick(&mut self, origin: Point3, direction: Vec3) -> Hit {
        self.pick_with_stats(origin, direction).0
    }

    /// [`Self::pick`], also returning traversal counters.
    pub fn pick_with_stats(&mut self, origin: Point3, direction: Vec3) -> (Hit, PickStats) {
        let ray = Ray::new(origin, direction);
        let leaf_size = self.settings.leaf_size;
        let mut query = Query::new(&self.settings);

        for (&entity, record) in self.meshes.iter_mut() {
            let Some(local) = query.enter(entity, record, &self.transforms, &ray) else {
                continue;
            };
            build_record(entity, record, leaf_size);
            query.traverse(entity, record, &local);
        }

        query.finish()
    }

    /// Closest hit without building anything.
    ///
    /// Fails with [`PickError::BvhNotBuilt`] if any registered entity has
    /// no BVH yet; call [`Self::build_all`] first.
    pub fn pick_ready(&self, origin: Point3, direction: Vec3) -> Result<Hit> {
        let ray = Ray::new(origin, direction);
        let mut query = Query::new(&self.settings);

        for (&entity, record) in self.meshes.iter() {
            if !record.built {
                return Err(PickError::BvhNotBuilt(entity));
            }
            let Some(local) = query.enter(entity, record, &self.transforms, &ray) else {
                continue;
            };
            query.traverse(entity, record, &local);
        }

        Ok(query.finish().0)
    }

    /// [`Self::pick`] taking raw component slices.
    ///
    /// Both slices must hold exactly three components. A miss is `Ok(None)`.
    pub fn pick_slices(&mut self, origin: &[f32], direction: &[f32]) -> Result<Option<Hit>> {
        let origin = vec3_from_slice("origin", origin)?;
        let direction = vec3_from_slice("direction", direction)?;
        Ok(self.pick(Point3::from(origin), direction).into_option())
    }

    /// Pick through pixel `(x, y)` (top-left origin) of a camera view.
    pub fn pick_screen(
        &mut self,
        viewport: Viewport,
        camera: &CameraMatrices,
        x: f64,
        y: f64,
    ) -> Result<Hit> {
        let ray = screen_ray(viewport, camera, x, y)?;
        Ok(self.pick(ray.origin, ray.direction.into_inner()))
    }
}

fn build_record(entity: EntityId, record: &mut MeshRecord, leaf_size: usize) {
    if record.build(leaf_size) {
        debug!(
            "built BVH for entity {entity}: {} triangles, {} nodes, depth {}",
            record.geometry.num_triangles(),
            record.bvh.node_count(),
            record.bvh.depth()
        );
    }
}

fn vec3_from_slice(name: &'static str, values: &[f32]) -> Result<Vec3> {
    match values {
        &[x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(PickError::InvalidVector {
            name,
            len: values.len(),
        }),
    }
}

/// State of one pick across all entities.
struct Query {
    best: Hit,
    stats: PickStats,
    stack: Vec<u32>,
}

impl Query {
    fn new(settings: &PickSettings) -> Self {
        Self {
            best: Hit::none(),
            stats: PickStats::default(),
            stack: Vec::with_capacity(settings.traversal_stack_capacity),
        }
    }

    /// Map the ray into `entity`'s space and run the broad phase against
    /// the best distance so far.
    fn enter(
        &mut self,
        entity: EntityId,
        record: &MeshRecord,
        transforms: &FxHashMap<EntityId, CachedTransform>,
        ray: &Ray,
    ) -> Option<LocalRay> {
        let local = match transforms.get(&entity) {
            None => LocalRay {
                ray: *ray,
                scale: 1.0,
            },
            Some(cached) => match &cached.world_to_local {
                Some(world_to_local) => {
                    let (ray, scale) = ray.to_local(world_to_local);
                    LocalRay { ray, scale }
                }
                None => {
                    self.stats.entities_skipped += 1;
                    return None;
                }
            },
        };

        let bounds = record.local_bounds();
        if bounds.is_empty() || !local.ray.intersect_aabb(&bounds, self.best.distance * local.scale) {
            self.stats.entities_culled += 1;
            return None;
        }
        self.stats.entities_tested += 1;
        Some(local)
    }

    fn traverse(&mut self, entity: EntityId, record: &MeshRecord, local: &LocalRay) {
        let geometry = &record.geometry;
        let mut traversal = TraversalStats::default();
        let closest = record.bvh.closest_hit(
            &local.ray,
            &geometry.positions,
            &geometry.indices,
            self.best.distance * local.scale,
            &mut self.stack,
            &mut traversal,
        );
        self.stats.add_traversal(&traversal);

        if let Some((triangle, hit)) = closest {
            let distance = hit.t / local.scale;
            if distance < self.best.distance {
                self.best = Hit::from_triangle(entity, triangle, distance, &hit);
            }
        }
    }

    fn finish(self) -> (Hit, PickStats) {
        trace!(
            "pick: {} entities tested, {} culled, {} skipped, {} nodes, {} triangles",
            self.stats.entities_tested,
            self.stats.entities_culled,
            self.stats.entities_skipped,
            self.stats.nodes_visited,
            self.stats.triangles_tested
        );
        (self.best, self.stats)
    }
}
