//! Pixel to world-space ray conversion.

use meshpick_math::{Point3, Vec3};
use meshpick_raytrace::Ray;
use nalgebra::{Matrix4, Point3 as Point3d, Vector3, Vector4};

use crate::error::{PickError, Result};

/// Below this magnitude the projection's `[3][3]` entry marks a perspective camera.
const PERSPECTIVE_EPSILON: f64 = 1e-6;

/// Viewport size in pixels.
///
/// Pixel coordinates are given with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Viewport {
    /// Create a viewport.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    fn check(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(PickError::EmptyViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Camera matrices in OpenGL clip conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// View to clip space.
    pub projection: Matrix4<f64>,
    /// World to view space.
    pub view: Matrix4<f64>,
}

impl CameraMatrices {
    /// Bundle a projection and a view matrix.
    pub fn new(projection: Matrix4<f64>, view: Matrix4<f64>) -> Self {
        Self { projection, view }
    }

    /// True when the projection has a perspective divide.
    pub fn is_perspective(&self) -> bool {
        self.projection[(3, 3)].abs() < PERSPECTIVE_EPSILON
    }

    /// Camera position in world space.
    pub fn position(&self) -> Result<Point3d<f64>> {
        let model = self.camera_model()?;
        Ok(Point3d::from(model.fixed_view::<3, 1>(0, 3).into_owned()))
    }

    /// Unit viewing direction in world space (view-space -Z).
    pub fn forward(&self) -> Result<Vector3<f64>> {
        let model = self.camera_model()?;
        Ok(-model.fixed_view::<3, 1>(0, 2).into_owned().normalize())
    }

    fn camera_model(&self) -> Result<Matrix4<f64>> {
        self.view
            .try_inverse()
            .ok_or(PickError::SingularMatrix("view"))
    }
}

/// Convert pixel `(x, y)` (top-left origin) to a world-space pick ray.
///
/// The pixel maps to normalized device coordinates on the near plane.
/// A perspective camera shoots from its position through that point; an
/// orthographic camera shoots from that point along its forward vector.
pub fn screen_ray(viewport: Viewport, camera: &CameraMatrices, x: f64, y: f64) -> Result<Ray> {
    viewport.check()?;
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);

    let flipped_y = height - 1.0 - y;
    let ndc_x = x / width * 2.0 - 1.0;
    let ndc_y = flipped_y / height * 2.0 - 1.0;

    let inv_projection = camera
        .projection
        .try_inverse()
        .ok_or(PickError::SingularMatrix("projection"))?;
    let camera_model = camera.camera_model()?;

    let near = inv_projection * Vector4::new(ndc_x, ndc_y, -1.0, 1.0);
    let near = if near.w.abs() > f64::EPSILON {
        near.xyz() / near.w
    } else {
        near.xyz()
    };

    let (origin, direction) = if camera.is_perspective() {
        let origin = camera_model * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let direction = camera_model * near.push(0.0);
        (origin.xyz(), direction.xyz())
    } else {
        let origin = camera_model * near.push(1.0);
        (origin.xyz(), camera.forward()?)
    };

    Ok(Ray::new(
        Point3::new(origin.x as f32, origin.y as f32, origin.z as f32),
        Vec3::new(direction.x as f32, direction.y as f32, direction.z as f32),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: i32 = 1001;

    fn look_at(eye: [f64; 3], target: [f64; 3]) -> Matrix4<f64> {
        Matrix4::look_at_rh(
            &Point3d::new(eye[0], eye[1], eye[2]),
            &Point3d::new(target[0], target[1], target[2]),
            &Vector3::y(),
        )
    }

    fn perspective_camera() -> CameraMatrices {
        CameraMatrices::new(
            Matrix4::new_perspective(1.0, 60f64.to_radians(), 0.1, 100.0),
            look_at([0.0, 0.0, 5.0], [0.0, 0.0, 0.0]),
        )
    }

    fn ortho_camera() -> CameraMatrices {
        CameraMatrices::new(
            Matrix4::new_orthographic(-2.0, 2.0, -2.0, 2.0, 0.1, 100.0),
            look_at([0.0, 0.0, 5.0], [0.0, 0.0, 0.0]),
        )
    }

    #[test]
    fn test_projection_classification() {
        assert!(perspective_camera().is_perspective());
        assert!(!ortho_camera().is_perspective());
    }

    #[test]
    fn test_camera_position_and_forward() {
        let camera = perspective_camera();
        let p = camera.position().unwrap();
        assert!((p - Point3d::new(0.0, 0.0, 5.0)).norm() < 1e-9);
        let f = camera.forward().unwrap();
        assert!((f - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_perspective_center_pixel() {
        let half = f64::from(SIZE / 2);
        let ray = screen_ray(Viewport::new(SIZE, SIZE), &perspective_camera(), half, half).unwrap();
        assert!((ray.origin - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-5);
        assert!((ray.direction.into_inner() - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-2);
    }

    #[test]
    fn test_perspective_top_left_points_up_left() {
        let ray = screen_ray(Viewport::new(SIZE, SIZE), &perspective_camera(), 0.0, 0.0).unwrap();
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
        assert!(ray.direction.z < 0.0);
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let camera = ortho_camera();
        let viewport = Viewport::new(SIZE, SIZE);
        let a = screen_ray(viewport, &camera, 0.0, 0.0).unwrap();
        let b = screen_ray(viewport, &camera, 900.0, 300.0).unwrap();
        assert!((a.direction.into_inner() - b.direction.into_inner()).norm() < 1e-6);
        assert!((a.direction.into_inner() - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
        // Origins lie on the near plane, 0.1 in front of the eye.
        assert!((a.origin.z - 4.9).abs() < 1e-4);
        assert!((a.origin.x + 2.0).abs() < 1e-4);
        assert!(a.origin.y > 1.9);
    }

    #[test]
    fn test_empty_viewport() {
        let err = screen_ray(Viewport::new(0, 10), &perspective_camera(), 0.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            PickError::EmptyViewport {
                width: 0,
                height: 10
            }
        ));
    }

    #[test]
    fn test_singular_view() {
        let camera = CameraMatrices::new(perspective_camera().projection, Matrix4::zeros());
        let err = screen_ray(Viewport::new(10, 10), &camera, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, PickError::SingularMatrix("view")));
    }
}
