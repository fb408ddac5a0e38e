use crate::config::EditorConfig;
use crate::error::EditError;
use crate::sprite::EditableSprite;
use glam::{Mat4, UVec3, Vec2};
use voxsprite_atlas::AtlasRegistry;
use voxsprite_common::Rgba;
use voxsprite_input::{Action, PointerEdge, PointerSample};

/// An edit that can be applied to the atlas and reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    /// Set one voxel. Undo = write `old` back.
    Paint { coord: UVec3, old: Rgba, new: Rgba },
}

impl EditCommand {
    /// Produce the inverse command (for undo).
    pub fn inverse(&self) -> Self {
        match *self {
            Self::Paint { coord, old, new } => Self::Paint {
                coord,
                old: new,
                new: old,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragStart {
    point: Vec2,
    rotation: Mat4,
}

/// Pointer-driven voxel editor with undo/redo.
///
/// A press over a sheet starts painting, anywhere else starts a rotation
/// drag. Both end on release.
#[derive(Debug)]
pub struct Editor {
    sprite: EditableSprite,
    config: EditorConfig,
    projection: Mat4,
    painting: bool,
    drag: Option<DragStart>,
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
}

impl Editor {
    pub fn new(sprite: EditableSprite, config: EditorConfig, aspect: f32) -> Self {
        Self {
            projection: config.projection(aspect),
            sprite,
            config,
            painting: false,
            drag: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn sprite(&self) -> &EditableSprite {
        &self.sprite
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_paint_color(&mut self, color: Rgba) {
        self.config.paint_color = color;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection = self.config.projection(aspect);
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Feed one pointer sample and return what it did.
    pub fn handle_pointer(
        &mut self,
        registry: &mut AtlasRegistry,
        sample: PointerSample,
    ) -> Result<Action, EditError> {
        let point = sample.position;
        match sample.edge {
            PointerEdge::Pressed => {
                let hit = self
                    .sprite
                    .sheets()
                    .iter()
                    .find_map(|sheet| sheet.pick(self.projection, point));
                if let Some(voxel) = hit {
                    self.painting = true;
                    self.paint(registry, voxel, self.config.paint_color)?;
                    return Ok(Action::Paint(point));
                }
                self.drag = Some(DragStart {
                    point,
                    rotation: self.sprite.rotation(),
                });
                Ok(Action::BeginDrag(point))
            }
            PointerEdge::Released => {
                self.painting = false;
                Ok(match self.drag.take() {
                    Some(_) => Action::EndDrag,
                    None => Action::Noop,
                })
            }
            PointerEdge::Held if self.painting => {
                let hits: Vec<UVec3> = self
                    .sprite
                    .sheets()
                    .iter()
                    .filter_map(|sheet| sheet.pick(self.projection, point))
                    .collect();
                for voxel in hits {
                    self.paint(registry, voxel, self.config.paint_color)?;
                }
                Ok(Action::Paint(point))
            }
            PointerEdge::Held => match self.drag {
                Some(start) => {
                    let speed = self.config.drag_speed;
                    let rotation = Mat4::from_rotation_y((point.x - start.point.x) * speed)
                        * Mat4::from_rotation_x((start.point.y - point.y) * speed)
                        * start.rotation;
                    self.sprite.set_rotation(rotation);
                    Ok(Action::Drag(point))
                }
                None => Ok(Action::Noop),
            },
            PointerEdge::Idle => Ok(Action::Noop),
        }
    }

    /// Apply an action that does not come from the pointer (undo/redo).
    pub fn apply(&mut self, registry: &mut AtlasRegistry, action: Action) -> Result<bool, EditError> {
        match action {
            Action::Undo => self.undo(registry),
            Action::Redo => self.redo(registry),
            _ => Ok(false),
        }
    }

    /// Paint one voxel and record it. Returns `false` (and records nothing)
    /// when the voxel already has `color`.
    pub fn paint(&mut self, registry: &mut AtlasRegistry, coord: UVec3, color: Rgba) -> Result<bool, EditError> {
        if self.sprite.get_voxel(registry, coord)? == color {
            return Ok(false);
        }
        let old = self.sprite.set_voxel(registry, coord, color)?;
        tracing::debug!(?coord, ?color, "voxel painted");
        self.undo_stack.push(EditCommand::Paint {
            coord,
            old,
            new: color,
        });
        self.redo_stack.clear();
        Ok(true)
    }

    /// Undo the last edit. Returns true if an operation was undone.
    pub fn undo(&mut self, registry: &mut AtlasRegistry) -> Result<bool, EditError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = self.execute(registry, &cmd.inverse()) {
            self.undo_stack.push(cmd);
            return Err(err);
        }
        self.redo_stack.push(cmd);
        Ok(true)
    }

    /// Redo the last undone edit. Returns true if an operation was redone.
    pub fn redo(&mut self, registry: &mut AtlasRegistry) -> Result<bool, EditError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = self.execute(registry, &cmd) {
            self.redo_stack.push(cmd);
            return Err(err);
        }
        self.undo_stack.push(cmd);
        Ok(true)
    }

    /// Number of operations on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of operations on the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn execute(&self, registry: &mut AtlasRegistry, cmd: &EditCommand) -> Result<(), EditError> {
        match *cmd {
            EditCommand::Paint { coord, new, .. } => {
                self.sprite.set_voxel(registry, coord, new)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use voxsprite_input::PointerTracker;

    fn setup() -> (AtlasRegistry, Editor) {
        let mut registry = AtlasRegistry::new();
        let config = EditorConfig::default();
        let sprite = EditableSprite::new(&mut registry, &config).unwrap();
        (registry, Editor::new(sprite, config, 1.0))
    }

    fn centre_of(editor: &Editor, x: u32, y: u32, z: u32) -> Vec2 {
        editor.sprite().sheets()[z as usize]
            .cell_center(editor.projection(), x, y)
            .unwrap()
    }

    #[test]
    fn press_on_sheet_paints_magenta() {
        let (mut registry, mut editor) = setup();
        let mut pointer = PointerTracker::new();
        let p = centre_of(&editor, 2, 5, 1);

        let action = editor.handle_pointer(&mut registry, pointer.update(p.x, p.y, 1)).unwrap();
        assert_eq!(action, Action::Paint(p));
        assert!(editor.is_painting());
        let voxel = editor.sprite().get_voxel(&registry, UVec3::new(2, 5, 1)).unwrap();
        assert_eq!(voxel, Rgba::MAGENTA);
        let image = registry.get(editor.sprite().atlas()).unwrap().image();
        assert_eq!(image.get_pixel(50, 2).0, [255, 0, 255, 255]);
        let painted = image.pixels().filter(|p| p.0 != [0, 0, 0, 0]).count();
        assert_eq!(painted, 1);

        editor.handle_pointer(&mut registry, pointer.update(p.x, p.y, 0)).unwrap();
        assert!(!editor.is_painting());
    }

    #[test]
    fn held_paints_along_the_stroke() {
        let (mut registry, mut editor) = setup();
        let mut pointer = PointerTracker::new();
        let a = centre_of(&editor, 0, 0, 3);
        let b = centre_of(&editor, 1, 0, 3);
        editor.handle_pointer(&mut registry, pointer.update(a.x, a.y, 1)).unwrap();
        editor.handle_pointer(&mut registry, pointer.update(a.x, a.y, 1)).unwrap();
        editor.handle_pointer(&mut registry, pointer.update(b.x, b.y, 1)).unwrap();
        assert_eq!(editor.undo_count(), 2);
        let sprite = editor.sprite();
        assert_eq!(sprite.get_voxel(&registry, UVec3::new(1, 0, 3)).unwrap(), Rgba::MAGENTA);
    }

    #[test]
    fn press_off_sheet_drags_rotation() {
        let (mut registry, mut editor) = setup();
        let mut pointer = PointerTracker::new();
        let action = editor
            .handle_pointer(&mut registry, pointer.update(-0.5, 0.0, 1))
            .unwrap();
        assert_eq!(action, Action::BeginDrag(Vec2::new(-0.5, 0.0)));

        editor
            .handle_pointer(&mut registry, pointer.update(-0.4, 0.0, 1))
            .unwrap();
        let expected = Mat4::from_rotation_y(0.1 * 5.0);
        let rotated = editor.sprite().rotation().transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(expected.transform_vector3(Vec3::X), 1e-5));

        let action = editor
            .handle_pointer(&mut registry, pointer.update(-0.4, 0.0, 0))
            .unwrap();
        assert_eq!(action, Action::EndDrag);
        assert!(!editor.is_dragging());
        assert_eq!(editor.undo_count(), 0);
    }

    #[test]
    fn drag_composes_with_start_rotation() {
        let (mut registry, mut editor) = setup();
        let mut pointer = PointerTracker::new();
        editor.handle_pointer(&mut registry, pointer.update(-0.5, 0.0, 1)).unwrap();
        editor.handle_pointer(&mut registry, pointer.update(-0.4, 0.0, 1)).unwrap();
        editor.handle_pointer(&mut registry, pointer.update(-0.4, 0.0, 0)).unwrap();
        let first = editor.sprite().rotation();

        editor.handle_pointer(&mut registry, pointer.update(-0.5, -0.8, 1)).unwrap();
        editor.handle_pointer(&mut registry, pointer.update(-0.5, -0.7, 1)).unwrap();
        let expected = Mat4::from_rotation_x(-0.1 * 5.0) * first;
        assert!(editor.sprite().rotation().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn undo_and_redo_paint() {
        let (mut registry, mut editor) = setup();
        let coord = UVec3::new(4, 4, 4);
        assert!(editor.paint(&mut registry, coord, Rgba::WHITE).unwrap());
        assert!(editor.paint(&mut registry, coord, Rgba::MAGENTA).unwrap());

        assert!(editor.apply(&mut registry, Action::Undo).unwrap());
        assert_eq!(editor.sprite().get_voxel(&registry, coord).unwrap(), Rgba::WHITE);
        assert!(editor.undo(&mut registry).unwrap());
        assert_eq!(editor.sprite().get_voxel(&registry, coord).unwrap(), Rgba::TRANSPARENT);
        assert!(!editor.undo(&mut registry).unwrap());

        assert!(editor.apply(&mut registry, Action::Redo).unwrap());
        assert_eq!(editor.sprite().get_voxel(&registry, coord).unwrap(), Rgba::WHITE);
        assert_eq!((editor.undo_count(), editor.redo_count()), (1, 1));
    }

    #[test]
    fn repainting_same_color_records_nothing() {
        let (mut registry, mut editor) = setup();
        let coord = UVec3::new(1, 1, 1);
        assert!(editor.paint(&mut registry, coord, Rgba::MAGENTA).unwrap());
        assert!(!editor.paint(&mut registry, coord, Rgba::MAGENTA).unwrap());
        assert_eq!(editor.undo_count(), 1);
    }

    #[test]
    fn new_paint_clears_redo() {
        let (mut registry, mut editor) = setup();
        editor.paint(&mut registry, UVec3::ZERO, Rgba::WHITE).unwrap();
        editor.undo(&mut registry).unwrap();
        assert!(editor.can_redo());
        editor.paint(&mut registry, UVec3::ONE, Rgba::WHITE).unwrap();
        assert!(!editor.can_redo());
    }

    #[test]
    fn paints_mark_atlas_dirty() {
        let (mut registry, mut editor) = setup();
        let id = editor.sprite().atlas();
        registry.mark_clean(id);
        editor.paint(&mut registry, UVec3::ZERO, Rgba::WHITE).unwrap();
        assert_eq!(registry.dirty_ids(), vec![id]);
    }
}
