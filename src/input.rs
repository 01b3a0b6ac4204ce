#[cfg(target_arch = "wasm32")]
pub mod wasm;

use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};
use parking_lot::RwLock;

/// Supplies the user controlled view matrix.
pub trait ViewMatrixProvider {
    fn view_matrix(&self) -> Mat4;
}

impl<T> ViewMatrixProvider for Arc<T>
where
    T: ViewMatrixProvider + ?Sized,
{
    fn view_matrix(&self) -> Mat4 {
        (**self).view_matrix()
    }
}

/// Virtual trackball: dragging the pointer rolls an imaginary ball centred
/// in the viewport.
#[derive(Debug)]
pub struct TrackballRotator {
    state: RwLock<TrackballState>,
}

#[derive(Debug)]
struct TrackballState {
    rotation: Quat,
    view_distance: f32,
    viewport: Vec2,
    drag_anchor: Option<Vec3>,
}

impl TrackballRotator {
    pub fn new(width: u32, height: u32, view_distance: f32) -> Self {
        Self {
            state: RwLock::new(TrackballState {
                rotation: Quat::IDENTITY,
                view_distance,
                viewport: Vec2::new(width.max(1) as f32, height.max(1) as f32),
                drag_anchor: None,
            }),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.state.write().viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    pub fn begin_drag(&self, pointer: Vec2) {
        let mut state = self.state.write();
        let anchor = state.project(pointer);
        state.drag_anchor = Some(anchor);
    }

    pub fn drag_to(&self, pointer: Vec2) {
        let mut state = self.state.write();
        let Some(anchor) = state.drag_anchor else {
            return;
        };
        let current = state.project(pointer);
        let axis = anchor.cross(current);
        if axis.length_squared() > f32::EPSILON {
            let angle = anchor.dot(current).clamp(-1.0, 1.0).acos();
            let delta = Quat::from_axis_angle(axis.normalize(), angle);
            state.rotation = (delta * state.rotation).normalize();
        }
        state.drag_anchor = Some(current);
    }

    pub fn end_drag(&self) {
        self.state.write().drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.state.read().drag_anchor.is_some()
    }

    pub fn rotation(&self) -> Quat {
        self.state.read().rotation
    }
}

impl TrackballState {
    /// Maps a pointer position in pixels onto the unit ball.
    fn project(&self, pointer: Vec2) -> Vec3 {
        let radius = self.viewport.min_element() / 2.0;
        let centred = pointer - self.viewport / 2.0;
        let x = centred.x / radius;
        let y = -centred.y / radius;
        let length_squared = x * x + y * y;
        if length_squared >= 1.0 {
            Vec3::new(x, y, 0.0).normalize()
        } else {
            Vec3::new(x, y, (1.0 - length_squared).sqrt())
        }
    }
}

impl ViewMatrixProvider for TrackballRotator {
    fn view_matrix(&self) -> Mat4 {
        let state = self.state.read();
        Mat4::from_translation(Vec3::new(0.0, 0.0, -state.view_distance))
            * Mat4::from_quat(state.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_view_is_identity() {
        let trackball = TrackballRotator::new(800, 600, 0.0);
        assert_eq!(trackball.view_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn horizontal_drag_rotates_about_y() {
        let trackball = TrackballRotator::new(400, 400, 0.0);
        trackball.begin_drag(Vec2::new(200.0, 200.0));
        trackball.drag_to(Vec2::new(300.0, 200.0));
        trackball.end_drag();

        let (axis, angle) = trackball.rotation().to_axis_angle();
        assert!(angle > 0.1);
        assert!((axis.y.abs() - 1.0).abs() < 1e-4);
        let view = trackball.view_matrix();
        assert!((view.determinant() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn moves_without_drag_are_ignored() {
        let trackball = TrackballRotator::new(400, 400, 0.0);
        trackball.drag_to(Vec2::new(10.0, 10.0));
        assert!(!trackball.is_dragging());
        assert_eq!(trackball.rotation(), Quat::IDENTITY);
    }

    #[test]
    fn view_distance_translates_back() {
        let trackball = TrackballRotator::new(100, 100, 3.0);
        let origin = trackball.view_matrix().transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(0.0, 0.0, -3.0));
    }
}
