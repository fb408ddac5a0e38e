use glam::Vec2;

/// Bit of the primary (left) button in the button mask.
pub const PRIMARY_BUTTON: u32 = 1;

/// Transition of the primary button between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEdge {
    Pressed,
    Released,
    Held,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Normalized device coordinates.
    pub position: Vec2,
    pub edge: PointerEdge,
}

/// Turns per-tick `(x, y, buttons)` into edges.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    last_buttons: u32,
    position: Vec2,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn update(&mut self, x: f32, y: f32, buttons: u32) -> PointerSample {
        let was = self.last_buttons & PRIMARY_BUTTON != 0;
        let is = buttons & PRIMARY_BUTTON != 0;
        let edge = match (was, is) {
            (false, true) => PointerEdge::Pressed,
            (true, false) => PointerEdge::Released,
            (true, true) => PointerEdge::Held,
            (false, false) => PointerEdge::Idle,
        };
        if edge == PointerEdge::Pressed || edge == PointerEdge::Released {
            tracing::trace!(?edge, x, y, "pointer edge");
        }
        self.last_buttons = buttons;
        self.position = Vec2::new(x, y);
        PointerSample {
            position: self.position,
            edge,
        }
    }

    /// Window pixel coordinates to NDC, y up.
    pub fn to_ndc(px: f32, py: f32, width: f32, height: f32) -> Vec2 {
        Vec2::new(
            px / width.max(1.0) * 2.0 - 1.0,
            1.0 - py / height.max(1.0) * 2.0,
        )
    }
}
