use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::{Mat4, UVec3, Vec3};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use voxsprite_atlas::{AtlasLayout, VoxelAtlas};
use voxsprite_common::Rgba;
use voxsprite_input::KeyBindings;
use voxsprite_render::{
    Camera, GraphicsDevice, RecordingDevice, SoftwareRenderer, SpriteInstance, max_march_steps,
    shaders,
};
use voxsprite_sprite::{RenderContext, Scene, SceneConfig};

#[derive(Parser)]
#[command(name = "voxsprite-cli", about = "CLI tool for voxel sprite atlases")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, program layouts and march bounds
    Info,
    /// Write an empty cube atlas
    NewAtlas {
        output: PathBuf,
        /// Grid edge in voxels
        #[arg(short, long, default_value = "8")]
        edge: u32,
    },
    /// Set one voxel in an atlas
    Paint {
        atlas: PathBuf,
        x: u32,
        y: u32,
        z: u32,
        /// Color as r,g,b[,a]
        #[arg(long, default_value = "255,0,255")]
        color: String,
        /// Write here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Describe an atlas and optionally list its solid voxels
    Inspect {
        atlas: PathBuf,
        #[arg(long)]
        voxels: bool,
    },
    /// Ray-march one sprite of an atlas into a PNG
    Render {
        atlas: PathBuf,
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,
        /// Sprite index in a stacked atlas
        #[arg(long, default_value = "0")]
        index: u32,
        #[arg(long, default_value = "256")]
        width: u32,
        #[arg(long, default_value = "256")]
        height: u32,
        /// Sprite rotation about Y, degrees
        #[arg(long, default_value = "30")]
        yaw: f32,
        /// Sprite rotation about X, degrees
        #[arg(long, default_value = "20")]
        pitch: f32,
        #[arg(long, default_value = "2.5")]
        distance: f32,
    },
    /// Run the pond scene headless
    Simulate {
        #[arg(short, long, default_value = "300")]
        ticks: u64,
        /// Directory with the game atlases; placeholders when omitted
        #[arg(long)]
        assets: Option<PathBuf>,
        /// Keys held every tick (a = left, s = dive, d = right)
        #[arg(long, default_value = "s")]
        hold: String,
        /// Print a summary every N ticks (0 = only at the end)
        #[arg(long, default_value = "0")]
        report: u64,
        /// Render the final frame to this PNG
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

/// Parse `r,g,b` or `r,g,b,a`.
fn parse_color(text: &str) -> anyhow::Result<Rgba> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid color '{text}'"))?;
    match parts[..] {
        [r, g, b] => Ok(Rgba::rgb(r, g, b)),
        [r, g, b, a] => Ok(Rgba::new(r, g, b, a)),
        _ => bail!("color needs 3 or 4 components, got '{text}'"),
    }
}

/// Layout of an atlas image: a single `n³` cube (`n² x n`) or a vertical
/// stack of them (`n² x k·n`).
fn infer_layout(width: u32, height: u32) -> anyhow::Result<AtlasLayout> {
    let edge = (width as f64).sqrt().round() as u32;
    if edge == 0 || edge * edge != width || height % edge != 0 {
        bail!("{width}x{height} is not a cube atlas (expected n² x k·n)");
    }
    let stack = height / edge;
    let size = UVec3::splat(edge);
    Ok(if stack == 1 {
        AtlasLayout::new(size)?
    } else {
        AtlasLayout::stacked(size, stack)?
    })
}

fn load_atlas(path: &Path) -> anyhow::Result<VoxelAtlas> {
    let (width, height) = image::image_dimensions(path).with_context(|| format!("reading {}", path.display()))?;
    let layout = infer_layout(width, height)?;
    Ok(VoxelAtlas::load(path, layout)?)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SceneConfig> {
    let config = match path {
        Some(path) => SceneConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SceneConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("voxsprite-cli v{}", env!("CARGO_PKG_VERSION"));
            let mut device = RecordingDevice::new();
            for desc in [shaders::sprite_program()?, shaders::sheet_program()?] {
                device.compile_program(&desc)?;
                println!("program '{}': {} uniform bytes", desc.label, desc.uniforms.byte_size());
                for slot in desc.uniforms.slots() {
                    println!("  {:>4}  {:<10} {:?}", slot.offset, slot.name, slot.kind);
                }
            }
            for edge in [8, 16] {
                println!("march bound {edge}³: {}", max_march_steps(UVec3::splat(edge)));
            }
        }
        Commands::NewAtlas { output, edge } => {
            let atlas = VoxelAtlas::empty(AtlasLayout::cube(edge)?);
            atlas.save(&output)?;
            let (w, h) = atlas.layout().dimensions();
            println!("Wrote empty {edge}³ atlas ({w}x{h}) to {}", output.display());
        }
        Commands::Paint {
            atlas,
            x,
            y,
            z,
            color,
            output,
        } => {
            let color = parse_color(&color)?;
            let mut map = load_atlas(&atlas)?;
            let old = map.get_voxel(x, y, z)?;
            map.set_voxel(x, y, z, color)?;
            let target = output.unwrap_or(atlas);
            map.save(&target)?;
            println!("({x}, {y}, {z}): {old:?} -> {color:?}, saved {}", target.display());
        }
        Commands::Inspect { atlas, voxels } => {
            let map = load_atlas(&atlas)?;
            let layout = map.layout();
            let (w, h) = layout.dimensions();
            println!("Atlas: {}", atlas.display());
            println!("  image: {w}x{h}");
            println!("  grid: {}  stack: {}  order: {:?}", layout.size, layout.stack, layout.order);
            println!("  solid voxels: {}", map.solid_count());
            println!("  fingerprint: {:#018x}", map.fingerprint());
            for index in 0..layout.stack {
                let grid = map.to_grid(index)?;
                if layout.stack > 1 && grid.solid_count() > 0 {
                    println!("  sprite {index}: {} solid", grid.solid_count());
                }
                if voxels {
                    for (voxel, color) in grid.iter().filter(|(_, c)| c.is_solid()) {
                        println!("    [{index}] {voxel} {:?}", color.to_array());
                    }
                }
            }
        }
        Commands::Render {
            atlas,
            output,
            index,
            width,
            height,
            yaw,
            pitch,
            distance,
        } => {
            let map = load_atlas(&atlas)?;
            if index >= map.layout().stack {
                bail!("sprite {index} is outside a stack of {}", map.layout().stack);
            }
            let view = map.view(index);
            let model = Mat4::from_rotation_x(pitch.to_radians()) * Mat4::from_rotation_y(yaw.to_radians());
            let camera = Camera::look_at(Vec3::new(0.0, 0.0, distance), Vec3::ZERO).with_aspect(width, height);
            let renderer = SoftwareRenderer::new(width, height).with_background(Rgba::new(26, 26, 38, 255));
            let image = renderer.render(&camera, &[SpriteInstance { model, sampler: &view }]);
            image.save(&output)?;
            println!("Rendered {} sprite {index} to {}", atlas.display(), output.display());
        }
        Commands::Simulate {
            ticks,
            assets,
            hold,
            report,
            snapshot,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let ctx = match &assets {
                Some(dir) => RenderContext::load_dir(dir)?,
                None => RenderContext::placeholder()?,
            };
            let held: Vec<String> = hold.chars().map(|c| c.to_string()).collect();
            let action = KeyBindings::default().steer(held.iter().map(String::as_str));

            let mut scene = Scene::new(config, &ctx)?;
            println!("Simulating {ticks} ticks with {action:?}");
            for _ in 0..ticks {
                scene.apply(action)?;
                if report > 0 && scene.tick() % report == 0 {
                    println!("{}", scene.summary());
                }
            }
            println!("{}", scene.summary());

            if let Some(path) = snapshot {
                let (eye, target) = scene.camera_rig();
                let camera = Camera::look_at(eye, target).with_aspect(320, 240);
                let renderer = SoftwareRenderer::new(320, 240).with_background(Rgba::new(40, 90, 140, 255));
                let image = renderer.render_sprites(
                    &camera,
                    scene.sprites().iter().chain(scene.hud()),
                    &ctx.registry,
                );
                image.save(&path)?;
                println!("Snapshot written to {}", path.display());
            }
        }
    }

    Ok(())
}
