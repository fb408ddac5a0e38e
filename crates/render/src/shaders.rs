use crate::device::{AttributeSlot, DeviceError, ProgramDesc, UniformKind, UniformSchema};

/// WGSL program that ray-marches a voxel sprite inside its bounding cube.
///
/// `grid_size.w` is the slice order (0 descending, 1 ascending) and
/// `region` packs the sub-region as `(scale.xy, offset.xy)`.
pub const SPRITE_SHADER: &str = r#"
struct SpriteUniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    eye_local: vec4<f32>,
    grid_size: vec4<f32>,
    region: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: SpriteUniforms;
@group(0) @binding(1)
var atlas: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec3<f32>,
};

@vertex
fn vs_sprite(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model * vec4<f32>(vertex.position, 1.0);
    out.local = vertex.position;
    return out;
}

fn fetch(voxel: vec3<i32>) -> vec4<f32> {
    let size = vec3<i32>(u.grid_size.xyz);
    var slice = size.z - 1 - voxel.z;
    if (u.grid_size.w > 0.5) {
        slice = voxel.z;
    }
    let sprite = vec2<f32>(f32(size.x * size.z), f32(size.y));
    let uv = (vec2<f32>(f32(voxel.x + size.x * slice), f32(size.y - 1 - voxel.y)) + 0.5) / sprite;
    let atlas_uv = uv * u.region.xy + u.region.zw;
    let dims = vec2<i32>(textureDimensions(atlas));
    let texel = clamp(vec2<i32>(floor(atlas_uv * vec2<f32>(dims))), vec2<i32>(0), dims - 1);
    return textureLoad(atlas, texel, 0);
}

@fragment
fn fs_sprite(in: VertexOutput) -> @location(0) vec4<f32> {
    let size = vec3<i32>(u.grid_size.xyz);
    let cells = u.grid_size.xyz;
    let near = in.local;
    let dir = normalize(near - u.eye_local.xyz);
    let stride = vec3<i32>(sign(dir));
    var voxel = clamp(vec3<i32>(floor((near + 0.5) * cells)), vec3<i32>(0), size - 1);

    var far_len = 1e30;
    var next = vec3<f32>(1e30);
    var delta = vec3<f32>(1e30);
    for (var axis = 0; axis < 3; axis++) {
        if (stride[axis] != 0) {
            let exit = 0.5 * f32(stride[axis]);
            far_len = min(far_len, (exit - near[axis]) / dir[axis]);
            var edge = voxel[axis];
            if (stride[axis] > 0) {
                edge = edge + 1;
            }
            let boundary = f32(edge) / cells[axis] - 0.5;
            next[axis] = (boundary - near[axis]) / dir[axis];
            delta[axis] = 1.0 / (abs(dir[axis]) * cells[axis]);
        }
    }
    far_len = far_len * 0.999;

    let d = abs(near);
    var normal = vec3<i32>(0);
    if (d.x >= d.y && d.x >= d.z) {
        normal.x = select(1, -1, near.x < 0.0);
    } else if (d.y >= d.z) {
        normal.y = select(1, -1, near.y < 0.0);
    } else {
        normal.z = select(1, -1, near.z < 0.0);
    }

    var travelled = 0.0;
    let max_steps = size.x + size.y + size.z - 2;
    for (var i = 0; i < max_steps; i++) {
        let color = fetch(voxel);
        if (color.a > 0.0) {
            let lighting = dot(abs(vec3<f32>(normal)), abs(dir) * 0.5 + 0.5);
            return vec4<f32>(color.rgb * lighting, 1.0);
        }
        var axis = 2;
        if (next.x <= next.y && next.x <= next.z) {
            axis = 0;
        } else if (next.y <= next.z) {
            axis = 1;
        }
        travelled = next[axis];
        voxel[axis] = voxel[axis] + stride[axis];
        next[axis] = next[axis] + delta[axis];
        normal = vec3<i32>(0);
        normal[axis] = -stride[axis];
        if (travelled >= far_len || any(voxel < vec3<i32>(0)) || any(voxel >= size)) {
            discard;
        }
    }
    discard;
}
"#;

/// WGSL program for an editor sheet: a flat quad showing one z layer.
/// Empty cells draw as a checkerboard.
pub const SHEET_SHADER: &str = r#"
struct SheetUniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    grid_size: vec4<f32>,
    region: vec4<f32>,
    layer: f32,
};

@group(0) @binding(0)
var<uniform> u: SheetUniforms;
@group(0) @binding(1)
var atlas: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_sheet(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.position.xy * 0.5 + 0.5;
    return out;
}

fn fetch(voxel: vec3<i32>) -> vec4<f32> {
    let size = vec3<i32>(u.grid_size.xyz);
    var slice = size.z - 1 - voxel.z;
    if (u.grid_size.w > 0.5) {
        slice = voxel.z;
    }
    let sprite = vec2<f32>(f32(size.x * size.z), f32(size.y));
    let uv = (vec2<f32>(f32(voxel.x + size.x * slice), f32(size.y - 1 - voxel.y)) + 0.5) / sprite;
    let atlas_uv = uv * u.region.xy + u.region.zw;
    let dims = vec2<i32>(textureDimensions(atlas));
    let texel = clamp(vec2<i32>(floor(atlas_uv * vec2<f32>(dims))), vec2<i32>(0), dims - 1);
    return textureLoad(atlas, texel, 0);
}

@fragment
fn fs_sheet(in: VertexOutput) -> @location(0) vec4<f32> {
    let size = vec3<i32>(u.grid_size.xyz);
    let cell = clamp(vec2<i32>(floor(in.uv * u.grid_size.xy)), vec2<i32>(0), size.xy - 1);
    let color = fetch(vec3<i32>(cell, i32(u.layer)));
    if (color.a > 0.0) {
        return vec4<f32>(color.rgb, 1.0);
    }
    let checker = f32((cell.x + cell.y) % 2);
    return vec4<f32>(vec3<f32>(0.35 + 0.1 * checker), 0.6);
}
"#;

pub const POSITION_ATTRIBUTE: AttributeSlot = AttributeSlot {
    name: "position",
    location: 0,
};

pub fn sprite_program() -> Result<ProgramDesc, DeviceError> {
    Ok(ProgramDesc {
        label: "sprite",
        source: SPRITE_SHADER,
        vertex_entry: "vs_sprite",
        fragment_entry: "fs_sprite",
        uniforms: UniformSchema::new(&[
            ("projection", UniformKind::Mat4),
            ("model", UniformKind::Mat4),
            ("eye_local", UniformKind::Vec4),
            ("grid_size", UniformKind::Vec4),
            ("region", UniformKind::Vec4),
        ])?,
        attributes: vec![POSITION_ATTRIBUTE],
        blend: false,
    })
}

pub fn sheet_program() -> Result<ProgramDesc, DeviceError> {
    Ok(ProgramDesc {
        label: "sheet",
        source: SHEET_SHADER,
        vertex_entry: "vs_sheet",
        fragment_entry: "fs_sheet",
        uniforms: UniformSchema::new(&[
            ("projection", UniformKind::Mat4),
            ("model", UniformKind::Mat4),
            ("grid_size", UniformKind::Vec4),
            ("region", UniformKind::Vec4),
            ("layer", UniformKind::Float),
        ])?,
        attributes: vec![POSITION_ATTRIBUTE],
        blend: true,
    })
}

/// Unit cube `[-0.5, 0.5]³` as a counter-clockwise triangle list.
pub fn cube_vertices() -> Vec<[f32; 3]> {
    const P: f32 = 0.5;
    #[rustfmt::skip]
    let faces: [[[f32; 3]; 4]; 6] = [
        [[-P, -P,  P], [ P, -P,  P], [ P,  P,  P], [-P,  P,  P]], // +Z
        [[ P, -P, -P], [-P, -P, -P], [-P,  P, -P], [ P,  P, -P]], // -Z
        [[ P, -P,  P], [ P, -P, -P], [ P,  P, -P], [ P,  P,  P]], // +X
        [[-P, -P, -P], [-P, -P,  P], [-P,  P,  P], [-P,  P, -P]], // -X
        [[-P,  P,  P], [ P,  P,  P], [ P,  P, -P], [-P,  P, -P]], // +Y
        [[-P, -P, -P], [ P, -P, -P], [ P, -P,  P], [-P, -P,  P]], // -Y
    ];
    faces
        .iter()
        .flat_map(|[a, b, c, d]| [*a, *b, *c, *c, *d, *a])
        .collect()
}

/// The sheet quad `[-1, 1]²` at z = 0 as two triangles.
pub fn quad_vertices() -> Vec<[f32; 3]> {
    let [a, b, c, d] = [
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 0.0],
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
    ];
    vec![a, b, c, c, d, a]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn programs_pass_link_check() {
        sprite_program().unwrap().validate().unwrap();
        sheet_program().unwrap().validate().unwrap();
    }

    fn compile_wgsl(desc: &ProgramDesc) -> naga::Module {
        let module = naga::front::wgsl::parse_str(desc.source)
            .unwrap_or_else(|e| panic!("{} does not parse: {}", desc.label, e.emit_to_string(desc.source)));
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("{} fails validation: {e:?}", desc.label));
        module
    }

    #[test]
    fn programs_validate_as_wgsl() {
        for desc in [sprite_program().unwrap(), sheet_program().unwrap()] {
            let module = compile_wgsl(&desc);
            let stage_of = |name: &str| {
                module
                    .entry_points
                    .iter()
                    .find(|ep| ep.name == name)
                    .map(|ep| ep.stage)
            };
            assert_eq!(stage_of(desc.vertex_entry), Some(naga::ShaderStage::Vertex), "{}", desc.label);
            assert_eq!(stage_of(desc.fragment_entry), Some(naga::ShaderStage::Fragment), "{}", desc.label);
        }
    }

    #[test]
    fn uniform_blocks_match_schema_size() {
        for desc in [sprite_program().unwrap(), sheet_program().unwrap()] {
            let module = compile_wgsl(&desc);
            let block = module
                .global_variables
                .iter()
                .find(|(_, var)| var.space == naga::AddressSpace::Uniform)
                .map(|(_, var)| var.ty)
                .unwrap();
            let mut layouter = naga::proc::Layouter::default();
            layouter.update(module.to_ctx()).unwrap();
            assert_eq!(layouter[block].size as usize, desc.uniforms.byte_size(), "{}", desc.label);
        }
    }

    #[test]
    fn cube_faces_point_outwards() {
        let verts = cube_vertices();
        assert_eq!(verts.len(), 36);
        for tri in verts.chunks(3) {
            let [a, b, c] = [Vec3::from(tri[0]), Vec3::from(tri[1]), Vec3::from(tri[2])];
            let normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(normal.dot(centre) > 0.0);
        }
    }

    #[test]
    fn quad_faces_viewer() {
        let verts = quad_vertices();
        assert_eq!(verts.len(), 6);
        let [a, b, c] = [Vec3::from(verts[0]), Vec3::from(verts[1]), Vec3::from(verts[2])];
        assert!((b - a).cross(c - a).z > 0.0);
    }
}
