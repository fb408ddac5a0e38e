use crate::Action;
use serde::{Deserialize, Serialize};

/// Frog controls held during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Controls {
    pub left: bool,
    pub dive: bool,
    pub right: bool,
}

impl Controls {
    pub fn any(&self) -> bool {
        self.left || self.dive || self.right
    }
}

/// Key names bound to each control, matched case-insensitively against the
/// platform's key text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub left: String,
    pub dive: String,
    pub right: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: "a".into(),
            dive: "s".into(),
            right: "d".into(),
        }
    }
}

impl KeyBindings {
    /// Controls for the set of currently held keys.
    pub fn resolve<'a>(&self, held: impl IntoIterator<Item = &'a str>) -> Controls {
        let mut controls = Controls::default();
        for key in held {
            if key.eq_ignore_ascii_case(&self.left) {
                controls.left = true;
            } else if key.eq_ignore_ascii_case(&self.dive) {
                controls.dive = true;
            } else if key.eq_ignore_ascii_case(&self.right) {
                controls.right = true;
            }
        }
        controls
    }

    /// The steering action for one tick of held keys.
    pub fn steer<'a>(&self, held: impl IntoIterator<Item = &'a str>) -> Action {
        Action::Steer(self.resolve(held))
    }
}
