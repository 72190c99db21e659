//! Window input routed to the camera collaborator.
//!
//! [`Input`] folds raw winit events into per-frame state. Once per tick the
//! scheduler drains it into a [`CameraInput`], which is all a
//! [`CameraController`](crate::camera::CameraController) ever sees.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// One frame of camera-control input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// Cursor travel in pixels while the drag button was held.
    pub drag: Vec2,
    /// Wheel steps, positive away from the user.
    pub scroll: f32,
    /// Return the camera to its home pose.
    pub reset: bool,
}

/// Input state tracking for the orbit camera.
#[derive(Debug, Default)]
pub struct Input {
    dragging: bool,
    last_cursor: Option<Vec2>,
    drag: Vec2,
    scroll: f32,
    reset: bool,
    quit: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } if *button == MouseButton::Left => {
                self.set_dragging(*state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.scrolled(steps);
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Released && !event.repeat =>
            {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key_released(code);
                }
            }
            _ => {}
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_cursor = None;
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        if self.dragging {
            if let Some(last) = self.last_cursor {
                self.drag += position - last;
            }
            self.last_cursor = Some(position);
        }
    }

    pub fn scrolled(&mut self, steps: f32) {
        self.scroll += steps;
    }

    pub fn key_released(&mut self, code: KeyCode) {
        match code {
            KeyCode::KeyR => self.reset = true,
            KeyCode::Escape => self.quit = true,
            _ => {}
        }
    }

    /// Whether the user asked to close the window.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Drain this frame's accumulated camera input.
    pub fn take_camera_input(&mut self) -> CameraInput {
        let input = CameraInput {
            drag: self.drag,
            scroll: self.scroll,
            reset: self.reset,
        };
        self.drag = Vec2::ZERO;
        self.scroll = 0.0;
        self.reset = false;
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_only_while_held() {
        let mut input = Input::new();
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(50.0, 10.0));
        assert_eq!(input.take_camera_input().drag, Vec2::ZERO);

        input.set_dragging(true);
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(15.0, 7.0));
        input.cursor_moved(Vec2::new(20.0, 7.0));
        assert_eq!(input.take_camera_input().drag, Vec2::new(10.0, -3.0));
    }

    #[test]
    fn test_take_clears_per_frame_state() {
        let mut input = Input::new();
        input.scrolled(1.0);
        input.scrolled(0.5);
        input.key_released(KeyCode::KeyR);
        let first = input.take_camera_input();
        assert_eq!(first.scroll, 1.5);
        assert!(first.reset);
        assert_eq!(input.take_camera_input(), CameraInput::default());
    }

    #[test]
    fn test_escape_requests_quit() {
        let mut input = Input::new();
        assert!(!input.quit_requested());
        input.key_released(KeyCode::Escape);
        assert!(input.quit_requested());
    }
}
