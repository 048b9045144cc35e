// Window input, reduced to the few signals the frame driver reacts to.
// Also remembers the cursor position and window size between events.

use glam::Vec2;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// Cursor position in physical window pixels, origin top-left.
    PointerMoved(Vec2),
    PointerLeft,
    Resized { width: u32, height: u32 },
    VisibilityChanged { visible: bool },
    CloseRequested,
}

#[derive(Debug, Default)]
pub struct InputState {
    pub mouse_position: Option<Vec2>,
    pub window_size: (u32, u32),
    pub visible: bool,
}

impl InputState {
    pub fn new(window_size: (u32, u32)) -> Self {
        Self { mouse_position: None, window_size, visible: true }
    }

    /// Feed a winit WindowEvent. Returns the host event it maps to, if any.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<HostEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let p = Vec2::new(position.x as f32, position.y as f32);
                self.mouse_position = Some(p);
                Some(HostEvent::PointerMoved(p))
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
                Some(HostEvent::PointerLeft)
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
                Some(HostEvent::Resized { width: size.width, height: size.height })
            }
            WindowEvent::Occluded(occluded) => self.set_visible(!occluded),
            WindowEvent::Focused(_) => None,
            WindowEvent::CloseRequested => Some(HostEvent::CloseRequested),
            WindowEvent::KeyboardInput { event, .. } => {
                let escape = event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape);
                escape.then_some(HostEvent::CloseRequested)
            }
            _ => None,
        }
    }

    /// Also called by the host for zero-sized resizes, which some platforms send on minimize.
    pub fn set_visible(&mut self, visible: bool) -> Option<HostEvent> {
        if visible == self.visible {
            return None;
        }
        self.visible = visible;
        Some(HostEvent::VisibilityChanged { visible })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn resize_is_forwarded_and_remembered() {
        let mut input = InputState::new((10, 10));
        let event = input.process_event(&WindowEvent::Resized(PhysicalSize::new(640, 480)));
        assert_eq!(event, Some(HostEvent::Resized { width: 640, height: 480 }));
        assert_eq!(input.window_size, (640, 480));
    }

    #[test]
    fn occlusion_toggles_visibility_once() {
        let mut input = InputState::new((10, 10));
        assert_eq!(
            input.process_event(&WindowEvent::Occluded(true)),
            Some(HostEvent::VisibilityChanged { visible: false })
        );
        assert_eq!(input.process_event(&WindowEvent::Occluded(true)), None);
        assert_eq!(
            input.process_event(&WindowEvent::Occluded(false)),
            Some(HostEvent::VisibilityChanged { visible: true })
        );
    }

    #[test]
    fn close_request_passes_through() {
        let mut input = InputState::new((10, 10));
        assert_eq!(input.process_event(&WindowEvent::CloseRequested), Some(HostEvent::CloseRequested));
        assert_eq!(input.process_event(&WindowEvent::Focused(true)), None);
    }
}
