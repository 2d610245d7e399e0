use winit::event::{ElementState, MouseButton, WindowEvent};

use crate::math::{vec2, Vec2f};

/// Pointer input of a single window, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pointer {
    Press(Vec2f),
    /// The pointer moved while the button is held.
    Drag(Vec2f),
    Release,
}

/// Turns raw window events into [`Pointer`] events.
///
/// winit reports button changes without a position, so the last cursor position is tracked here.
/// Only the left mouse button paints.
#[derive(Debug, Default)]
pub struct PointerTracker {
    cursor: Option<Vec2f>,
    pressed: bool,
}

impl PointerTracker {
    pub fn translate(&mut self, event: &WindowEvent) -> Option<Pointer> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(vec2(position.x as f32, position.y as f32))
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::MouseInput { state, button, .. } => self.button(*state, *button),
            WindowEvent::Focused(false) => self.focus_lost(),
            _ => None,
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2f) -> Option<Pointer> {
        self.cursor = Some(position);
        self.pressed.then_some(Pointer::Drag(position))
    }

    pub fn button(&mut self, state: ElementState, button: MouseButton) -> Option<Pointer> {
        if button != MouseButton::Left {
            return None;
        }
        match (state, self.pressed) {
            (ElementState::Pressed, false) => {
                // Without a known position a press has nowhere to land.
                let position = self.cursor?;
                self.pressed = true;
                Some(Pointer::Press(position))
            }
            (ElementState::Released, true) => {
                self.pressed = false;
                Some(Pointer::Release)
            }
            _ => None,
        }
    }

    /// Ends a drag whose button release this window will never see.
    pub fn focus_lost(&mut self) -> Option<Pointer> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        Some(Pointer::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_drag_release() {
        let mut t = PointerTracker::default();
        assert_eq!(t.cursor_moved(vec2(1.0, 2.0)), None);
        assert_eq!(
            t.button(ElementState::Pressed, MouseButton::Left),
            Some(Pointer::Press(vec2(1.0, 2.0)))
        );
        assert_eq!(
            t.cursor_moved(vec2(3.0, 4.0)),
            Some(Pointer::Drag(vec2(3.0, 4.0)))
        );
        assert_eq!(
            t.button(ElementState::Released, MouseButton::Left),
            Some(Pointer::Release)
        );
        assert_eq!(t.cursor_moved(vec2(5.0, 5.0)), None);
    }

    #[test]
    fn ignores_other_buttons() {
        let mut t = PointerTracker::default();
        t.cursor_moved(vec2(1.0, 1.0));
        assert_eq!(t.button(ElementState::Pressed, MouseButton::Right), None);
        assert_eq!(t.cursor_moved(vec2(2.0, 2.0)), None);
    }

    #[test]
    fn press_needs_a_cursor_position() {
        let mut t = PointerTracker::default();
        assert_eq!(t.button(ElementState::Pressed, MouseButton::Left), None);
        assert_eq!(t.button(ElementState::Released, MouseButton::Left), None);
    }

    #[test]
    fn release_outside_the_window() {
        let mut t = PointerTracker::default();
        t.cursor_moved(vec2(1.0, 1.0));
        t.button(ElementState::Pressed, MouseButton::Left);
        t.cursor = None;
        assert_eq!(
            t.button(ElementState::Released, MouseButton::Left),
            Some(Pointer::Release)
        );
    }

    #[test]
    fn repeated_press_is_ignored() {
        let mut t = PointerTracker::default();
        t.cursor_moved(vec2(1.0, 1.0));
        assert!(t.button(ElementState::Pressed, MouseButton::Left).is_some());
        assert_eq!(t.button(ElementState::Pressed, MouseButton::Left), None);
    }

    #[test]
    fn losing_focus_releases() {
        let mut t = PointerTracker::default();
        assert_eq!(t.focus_lost(), None);
        t.cursor_moved(vec2(7.0, 8.0));
        t.button(ElementState::Pressed, MouseButton::Left);
        assert_eq!(t.focus_lost(), Some(Pointer::Release));
        assert_eq!(t.cursor_moved(vec2(9.0, 9.0)), None);
    }
}
