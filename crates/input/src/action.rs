use glam::Vec2;

/// A high-level action produced from input. The editor and the scene consume
/// actions, never raw events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Paint the voxel under the pointer.
    Paint(Vec2),
    /// Start rotating the sprite from this point.
    BeginDrag(Vec2),
    /// Continue a rotation drag.
    Drag(Vec2),
    EndDrag,
    /// Frog steering for one tick.
    Steer(crate::Controls),
    Undo,
    Redo,
    /// No-op (input that is not bound to anything).
    Noop,
}

impl Action {
    /// Whether this action changes atlas contents.
    pub fn is_edit(&self) -> bool {
        matches!(self, Action::Paint(_) | Action::Undo | Action::Redo)
    }
}
