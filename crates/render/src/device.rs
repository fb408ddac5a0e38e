use glam::{Mat4, Vec2, Vec4};
use image::RgbaImage;

/// Errors from compiling programs, binding uniforms and issuing draws.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("program '{label}' failed to compile: {reason}")]
    Compile { label: String, reason: String },
    #[error("program '{label}' does not use declared {what} '{name}'")]
    Link {
        label: String,
        what: &'static str,
        name: String,
    },
    #[error("uniform '{0}' declared twice")]
    DuplicateUniform(String),
    #[error("no value bound for uniform '{0}'")]
    MissingUniform(String),
    #[error("value bound for unknown uniform '{0}'")]
    UnknownUniform(String),
    #[error("uniform '{name}' expects {expected:?}, got {actual:?}")]
    UniformKind {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("texture update is {actual:?}, texture is {expected:?}")]
    TextureSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec4,
    Mat4,
}

impl UniformKind {
    pub const fn size(self) -> usize {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    pub const fn align(self) -> usize {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec4 | UniformKind::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write(&self, out: &mut [u8]) {
        match self {
            UniformValue::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: &'static str,
    pub kind: UniformKind,
    /// Byte offset in the packed uniform block.
    pub offset: usize,
}

/// Ordered, typed uniform declarations of one program, with the packed
/// layout (WGSL uniform address space rules) the values are uploaded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSchema {
    slots: Vec<UniformSlot>,
    size: usize,
}

impl UniformSchema {
    pub fn new(decls: &[(&'static str, UniformKind)]) -> Result<Self, DeviceError> {
        let mut slots: Vec<UniformSlot> = Vec::with_capacity(decls.len());
        let mut offset: usize = 0;
        for &(name, kind) in decls {
            if slots.iter().any(|s| s.name == name) {
                return Err(DeviceError::DuplicateUniform(name.to_string()));
            }
            offset = offset.next_multiple_of(kind.align());
            slots.push(UniformSlot { name, kind, offset });
            offset += kind.size();
        }
        Ok(Self {
            slots,
            size: offset.next_multiple_of(16),
        })
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// Packed block size in bytes, a multiple of 16.
    pub fn byte_size(&self) -> usize {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Check `values` against the schema and pack them. Every slot needs
    /// exactly one value of its kind.
    pub fn bind(&self, values: &[(&str, UniformValue)]) -> Result<BoundUniforms, DeviceError> {
        for (i, (name, _)) in values.iter().enumerate() {
            if self.slot(name).is_none() {
                return Err(DeviceError::UnknownUniform(name.to_string()));
            }
            if values[..i].iter().any(|(n, _)| n == name) {
                return Err(DeviceError::DuplicateUniform(name.to_string()));
            }
        }
        let mut bytes = vec![0u8; self.size];
        let mut ordered = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let (_, value) = values
                .iter()
                .find(|(n, _)| *n == slot.name)
                .ok_or_else(|| DeviceError::MissingUniform(slot.name.to_string()))?;
            if value.kind() != slot.kind {
                return Err(DeviceError::UniformKind {
                    name: slot.name.to_string(),
                    expected: slot.kind,
                    actual: value.kind(),
                });
            }
            value.write(&mut bytes[slot.offset..slot.offset + slot.kind.size()]);
            ordered.push(*value);
        }
        Ok(BoundUniforms {
            values: ordered,
            bytes,
        })
    }
}

/// Uniform values checked against a schema, in slot order, plus their
/// packed bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUniforms {
    values: Vec<UniformValue>,
    bytes: Vec<u8>,
}

impl BoundUniforms {
    pub fn values(&self) -> &[UniformValue] {
        &self.values
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A vertex attribute read by the program's vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: &'static str,
    pub location: u32,
}

/// Everything a device needs to build a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDesc {
    pub label: &'static str,
    pub source: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub uniforms: UniformSchema,
    pub attributes: Vec<AttributeSlot>,
    /// Alpha-blend the output instead of replacing.
    pub blend: bool,
}

impl ProgramDesc {
    /// Link check: every declared entry point, uniform and attribute must
    /// appear in the source.
    pub fn validate(&self) -> Result<(), DeviceError> {
        let missing = |what: &'static str, name: &str| DeviceError::Link {
            label: self.label.to_string(),
            what,
            name: name.to_string(),
        };
        for entry in [self.vertex_entry, self.fragment_entry] {
            if !contains_word(self.source, entry) {
                return Err(missing("entry point", entry));
            }
        }
        for slot in self.uniforms.slots() {
            if !contains_word(self.source, slot.name) {
                return Err(missing("uniform", slot.name));
            }
        }
        for attr in &self.attributes {
            if !contains_word(self.source, attr.name) {
                return Err(missing("attribute", attr.name));
            }
        }
        Ok(())
    }
}

fn contains_word(source: &str, word: &str) -> bool {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|w| w == word)
}

/// One draw: a program with bound uniforms, an optional texture and a
/// triangle list vertex buffer.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramHandle,
    pub uniforms: &'a BoundUniforms,
    pub texture: Option<TextureHandle>,
    pub vertices: BufferHandle,
    pub vertex_count: u32,
}

/// The minimal GPU surface the renderers need. Textures are sampled with
/// nearest filtering and clamp-to-edge addressing.
pub trait GraphicsDevice {
    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, DeviceError>;

    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, DeviceError>;

    /// Replace a texture's contents. Dimensions must match.
    fn update_texture(&mut self, texture: TextureHandle, image: &RgbaImage) -> Result<(), DeviceError>;

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 3]]) -> Result<BufferHandle, DeviceError>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), DeviceError>;
}
