//! Loading glTF scenes into a picking registry.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use meshpick::{EntityId, PickSettings, PickingRegistry};
use meshpick_extract::{load_gltf_scene, MeshInstance};

/// Entity id for a glTF node. Shifted by one so node 0 never collides
/// with [`EntityId::NONE`].
pub fn entity_for_node(node_index: usize) -> EntityId {
    EntityId(node_index as u32 + 1)
}

/// Inverse of [`entity_for_node`].
pub fn node_for_entity(entity: EntityId) -> Option<usize> {
    entity.0.checked_sub(1).map(|n| n as usize)
}

/// Load every mesh instance of the scene in `path`.
pub fn load_instances(path: &Path) -> Result<Vec<MeshInstance>> {
    let instances = load_gltf_scene(path)
        .with_context(|| format!("failed to load glTF scene {}", path.display()))?;
    info!("{}: {} mesh instances", path.display(), instances.len());
    Ok(instances)
}

/// Register each instance under its node's entity id and push its world transform.
pub fn build_registry(instances: &[MeshInstance], settings: PickSettings) -> Result<PickingRegistry> {
    let mut registry = PickingRegistry::with_settings(settings)?;
    for instance in instances {
        let entity = entity_for_node(instance.node_index);
        registry.register_mesh(entity, instance.geometry.clone());
        registry.set_world_transform(entity, instance.world);
    }
    Ok(registry)
}

/// Settings from `path`, or defaults.
pub fn load_settings(path: Option<&Path>) -> Result<PickSettings> {
    match path {
        Some(path) => PickSettings::from_file(path)
            .with_context(|| format!("failed to read settings {}", path.display())),
        None => Ok(PickSettings::default()),
    }
}
