//! meshpick CLI - cast pick rays into glTF scenes
//!
//! Loads a glTF file, registers every mesh-bearing node as a pickable
//! entity and reports the closest hit as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use meshpick::meshpick_math::{Point3, Vec3};
use meshpick::meshpick_raytrace::Bvh;
use meshpick::{CameraMatrices, Hit, Viewport};
use nalgebra::{Matrix4, Point3 as Point3d, Vector3};
use serde::Serialize;

mod scene;

#[derive(Parser)]
#[command(name = "meshpick")]
#[command(about = "Ray picking against glTF scenes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh and BVH statistics for every instance in a scene
    Info {
        /// Path to a .gltf or .glb file
        file: PathBuf,
        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Pick along a world-space ray
    Pick {
        /// Path to a .gltf or .glb file
        file: PathBuf,
        /// Ray origin as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        origin: [f32; 3],
        /// Ray direction as x,y,z (need not be normalized)
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: [f32; 3],
        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Pick through a pixel of a look-at camera
    PickScreen {
        /// Path to a .gltf or .glb file
        file: PathBuf,
        /// Camera position as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        eye: [f32; 3],
        /// Point the camera looks at as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        target: [f32; 3],
        /// Viewport width in pixels
        #[arg(long)]
        width: i32,
        /// Viewport height in pixels
        #[arg(long)]
        height: i32,
        /// Pixel column, from the left
        #[arg(long)]
        x: f64,
        /// Pixel row, from the top
        #[arg(long)]
        y: f64,
        /// Vertical field of view in degrees
        #[arg(long, default_value_t = 45.0, conflicts_with = "ortho_height")]
        fov_deg: f64,
        /// Use an orthographic camera showing this many world units vertically
        #[arg(long)]
        ortho_height: Option<f64>,
        /// Near clip distance
        #[arg(long, default_value_t = 0.1)]
        near: f64,
        /// Far clip distance
        #[arg(long, default_value_t = 1000.0)]
        far: f64,
        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Projection parameters for [`camera_matrices`].
#[derive(Debug, Clone, Copy)]
enum Projection {
    Perspective { fov_deg: f64 },
    Orthographic { height: f64 },
}

/// JSON form of a hit.
#[derive(Serialize)]
struct PickReport<'a> {
    node_index: Option<usize>,
    name: Option<&'a str>,
    point: [f32; 3],
    #[serde(flatten)]
    hit: Hit,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file, config } => {
            show_info(&file, config.as_deref())?;
        }
        Commands::Pick {
            file,
            origin,
            direction,
            config,
        } => {
            let origin = Point3::from(origin);
            let direction = Vec3::from(direction);
            pick_ray(&file, config.as_deref(), origin, direction)?;
        }
        Commands::PickScreen {
            file,
            eye,
            target,
            width,
            height,
            x,
            y,
            fov_deg,
            ortho_height,
            near,
            far,
            config,
        } => {
            let projection = match ortho_height {
                Some(height) => Projection::Orthographic { height },
                None => Projection::Perspective { fov_deg },
            };
            let camera = camera_matrices(eye, target, width, height, projection, near, far)?;
            let ray = meshpick::screen_ray(Viewport::new(width, height), &camera, x, y)?;
            pick_ray(
                &file,
                config.as_deref(),
                ray.origin,
                ray.direction.into_inner(),
            )?;
        }
    }

    Ok(())
}

fn show_info(file: &Path, config: Option<&Path>) -> Result<()> {
    let settings = scene::load_settings(config)?;
    let instances = scene::load_instances(file)?;

    println!("glTF scene: {}", file.display());
    println!("  Mesh instances: {}", instances.len());

    for instance in &instances {
        let geometry = &instance.geometry;
        let bvh = Bvh::build(&geometry.positions, &geometry.indices, settings.leaf_size);
        let name = instance.name.as_deref().unwrap_or("unnamed");
        println!(
            "\n  node {} ({}), mesh {}, entity {}",
            instance.node_index,
            name,
            instance.mesh_index,
            scene::entity_for_node(instance.node_index)
        );
        println!("    Vertices: {}", geometry.num_vertices());
        println!("    Triangles: {}", geometry.num_triangles());
        println!(
            "    BVH: {} nodes, {} leaves, depth {}",
            bvh.node_count(),
            bvh.leaf_count(),
            bvh.depth()
        );
    }

    let total_tris: usize = instances.iter().map(|i| i.geometry.num_triangles()).sum();
    println!("\n  Total triangles: {}", total_tris);

    Ok(())
}

fn pick_ray(file: &Path, config: Option<&Path>, origin: Point3, direction: Vec3) -> Result<()> {
    let settings = scene::load_settings(config)?;
    let instances = scene::load_instances(file)?;
    let mut registry = scene::build_registry(&instances, settings)?;

    let hit = registry.pick(origin, direction);
    let report = hit.into_option().map(|hit| {
        let node_index = scene::node_for_entity(hit.entity);
        let name = node_index
            .and_then(|n| instances.iter().find(|i| i.node_index == n))
            .and_then(|i| i.name.as_deref());
        let point = origin + direction.normalize() * hit.distance;
        PickReport {
            node_index,
            name,
            point: [point.x, point.y, point.z],
            hit,
        }
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Look-at view and projection for a `width` x `height` viewport.
fn camera_matrices(
    eye: [f32; 3],
    target: [f32; 3],
    width: i32,
    height: i32,
    projection: Projection,
    near: f64,
    far: f64,
) -> Result<CameraMatrices> {
    if width <= 0 || height <= 0 {
        bail!("viewport must be non-empty, got {width}x{height}");
    }
    if !(near > 0.0 && far > near) {
        bail!("clip range must satisfy 0 < near < far, got {near}..{far}");
    }

    let eye = Point3d::new(f64::from(eye[0]), f64::from(eye[1]), f64::from(eye[2]));
    let target = Point3d::new(f64::from(target[0]), f64::from(target[1]), f64::from(target[2]));
    let forward = target - eye;
    if forward.norm() < 1e-12 {
        bail!("eye and target coincide");
    }
    // Y up unless looking straight along it.
    let up = if forward.normalize().cross(&Vector3::y()).norm() < 1e-6 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    let view = Matrix4::look_at_rh(&eye, &target, &up);

    let aspect = f64::from(width) / f64::from(height);
    let projection = match projection {
        Projection::Perspective { fov_deg } => {
            if !(fov_deg > 0.0 && fov_deg < 180.0) {
                bail!("field of view must be in (0, 180) degrees, got {fov_deg}");
            }
            Matrix4::new_perspective(aspect, fov_deg.to_radians(), near, far)
        }
        Projection::Orthographic { height } => {
            if !(height > 0.0) {
                bail!("orthographic height must be positive, got {height}");
            }
            let half_h = height / 2.0;
            let half_w = half_h * aspect;
            Matrix4::new_orthographic(-half_w, half_w, -half_h, half_h, near, far)
        }
    };

    Ok(CameraMatrices::new(projection, view))
}

/// Parse `x,y,z`.
fn parse_vec3(s: &str) -> std::result::Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z, got '{s}'"));
    };
    let parse = |v: &str| v.parse::<f32>().map_err(|e| format!("'{v}': {e}"));
    Ok([parse(x)?, parse(y)?, parse(z)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1,-2.5, 3").unwrap(), [1.0, -2.5, 3.0]);
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,3,4").is_err());
        assert!(parse_vec3("a,b,c").is_err());
    }

    #[test]
    fn test_camera_matrices_perspective() {
        let camera = camera_matrices(
            [0.0, 0.0, 5.0],
            [0.0, 0.0, 0.0],
            640,
            480,
            Projection::Perspective { fov_deg: 60.0 },
            0.1,
            100.0,
        )
        .unwrap();
        assert!(camera.is_perspective());
        let eye = camera.position().unwrap();
        assert!((eye - Point3d::new(0.0, 0.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn test_camera_matrices_looking_down() {
        let camera = camera_matrices(
            [0.0, 10.0, 0.0],
            [0.0, 0.0, 0.0],
            100,
            100,
            Projection::Orthographic { height: 4.0 },
            0.1,
            100.0,
        )
        .unwrap();
        assert!(!camera.is_perspective());
        let forward = camera.forward().unwrap();
        assert!((forward - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_camera_matrices_rejects_bad_input() {
        let persp = Projection::Perspective { fov_deg: 45.0 };
        assert!(camera_matrices([0.0; 3], [0.0; 3], 10, 10, persp, 0.1, 10.0).is_err());
        assert!(camera_matrices([0.0, 0.0, 1.0], [0.0; 3], 0, 10, persp, 0.1, 10.0).is_err());
        assert!(camera_matrices([0.0, 0.0, 1.0], [0.0; 3], 10, 10, persp, 1.0, 0.5).is_err());
        let ortho = Projection::Orthographic { height: 0.0 };
        assert!(camera_matrices([0.0, 0.0, 1.0], [0.0; 3], 10, 10, ortho, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_report_serializes_hit_fields() {
        let hit = Hit {
            entity: meshpick::EntityId(4),
            triangle: 2,
            distance: 1.5,
            barycentric: Vec3::new(0.25, 0.25, 0.5),
        };
        let report = PickReport {
            node_index: Some(3),
            name: Some("wheel"),
            point: [0.0, 0.0, 1.5],
            hit,
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["node_index"], 3);
        assert_eq!(json["entity"], 4);
        assert_eq!(json["triangle"], 2);
        assert_eq!(json["barycentric"][2], 0.5);
    }
}
