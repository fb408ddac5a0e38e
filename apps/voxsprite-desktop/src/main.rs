use anyhow::Result;
use clap::{Parser, ValueEnum};
use egui::Context as EguiContext;
use glam::{Vec2, Vec3};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, KeyCode, ModifiersState, PhysicalKey};
use winit::window::{Window, WindowId};
use voxsprite_atlas::{AtlasRegistry, SubRegion};
use voxsprite_author::{EditableSprite, Editor, EditorConfig};
use voxsprite_common::Rgba;
use voxsprite_input::{Action, KeyBindings, PRIMARY_BUTTON, PointerTracker};
use voxsprite_render::{Camera, DeviceError, SheetRenderer, SpriteRenderer};
use voxsprite_render_wgpu::WgpuDevice;
use voxsprite_sprite::{RenderContext, Scene, SceneConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Editor,
    Game,
}

#[derive(Parser)]
#[command(name = "voxsprite-desktop", about = "Voxel sprite editor and pond game")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value = "game")]
    mode: Mode,

    /// Editor: working atlas to load and save
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Game: directory with the game atlases; placeholders when omitted
    #[arg(long)]
    assets: Option<PathBuf>,

    /// JSON config for the selected mode
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct EditorState {
    registry: AtlasRegistry,
    editor: Editor,
    pointer: PointerTracker,
    cursor: Vec2,
    buttons: u32,
    working: PathBuf,
    unsaved: bool,
}

impl EditorState {
    fn new(config: EditorConfig, atlas: Option<PathBuf>) -> Result<Self> {
        let mut registry = AtlasRegistry::new();
        let working = atlas.unwrap_or_else(|| PathBuf::from(&config.working_file));
        let sprite = EditableSprite::new(&mut registry, &config)?;
        if working.exists() {
            if let Err(e) = sprite.load_working(&mut registry, &working) {
                tracing::warn!("could not load {}: {e}", working.display());
            }
        }
        Ok(Self {
            registry,
            editor: Editor::new(sprite, config, 16.0 / 9.0),
            pointer: PointerTracker::new(),
            cursor: Vec2::ZERO,
            buttons: 0,
            working,
            unsaved: false,
        })
    }

    fn feed_pointer(&mut self) {
        let sample = self.pointer.update(self.cursor.x, self.cursor.y, self.buttons);
        match self.editor.handle_pointer(&mut self.registry, sample) {
            Ok(Action::Noop) => {}
            Ok(action) => {
                self.unsaved |= action.is_edit();
                tracing::trace!(?action, "editor action");
            }
            Err(e) => tracing::error!("edit failed: {e}"),
        }
    }

    fn apply(&mut self, action: Action) {
        match self.editor.apply(&mut self.registry, action) {
            Ok(true) => {
                self.unsaved |= action.is_edit();
                tracing::info!(?action, "applied");
            }
            Ok(false) => {}
            Err(e) => tracing::error!("{action:?} failed: {e}"),
        }
    }

    fn save(&mut self) {
        match self.editor.sprite().save_working(&self.registry, &self.working) {
            Ok(()) => self.unsaved = false,
            Err(e) => tracing::error!("failed to save {}: {e}", self.working.display()),
        }
    }

    fn load(&mut self) {
        match self.editor.sprite().load_working(&mut self.registry, &self.working) {
            Ok(()) => self.unsaved = false,
            Err(e) => tracing::error!("failed to load {}: {e}", self.working.display()),
        }
    }

    fn camera(&self, aspect: f32) -> Camera {
        Camera {
            fov_y: self.editor.config().fov_y_degrees.to_radians(),
            aspect,
            far: 100.0,
            ..Camera::look_at(Vec3::ZERO, Vec3::NEG_Z)
        }
    }
}

struct GameState {
    ctx: RenderContext,
    scene: Scene,
    bindings: KeyBindings,
    held: BTreeSet<String>,
    tick_accumulator: f64,
    tick_rate: f64,
}

impl GameState {
    fn new(config: SceneConfig, assets: Option<PathBuf>) -> Result<Self> {
        config.validate()?;
        let ctx = match &assets {
            Some(dir) => RenderContext::load_dir(dir)?,
            None => RenderContext::placeholder()?,
        };
        let tick_rate = config.tick_interval().as_secs_f64();
        let scene = Scene::new(config, &ctx)?;
        Ok(Self {
            ctx,
            scene,
            bindings: KeyBindings::default(),
            held: BTreeSet::new(),
            tick_accumulator: 0.0,
            tick_rate,
        })
    }

    fn update(&mut self, dt: f32) {
        // Fixed timestep for scene ticking
        self.tick_accumulator += dt as f64;
        while self.tick_accumulator >= self.tick_rate {
            self.tick_accumulator -= self.tick_rate;
            let action = self.bindings.steer(self.held.iter().map(String::as_str));
            if let Err(e) = self.scene.apply(action) {
                tracing::error!("scene step failed: {e}");
            }
        }
    }

    fn camera(&self, aspect: f32) -> Camera {
        let (eye, target) = self.scene.camera_rig();
        Camera {
            aspect,
            ..Camera::look_at(eye, target)
        }
    }
}

enum AppState {
    Editor(Box<EditorState>),
    Game(Box<GameState>),
}

impl AppState {
    fn registry_mut(&mut self) -> &mut AtlasRegistry {
        match self {
            AppState::Editor(state) => &mut state.registry,
            AppState::Game(state) => &mut state.ctx.registry,
        }
    }

    fn update(&mut self, dt: f32) {
        if let AppState::Game(state) = self {
            state.update(dt);
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, modifiers: ModifiersState) {
        let pressed = event.state == ElementState::Pressed;
        match self {
            AppState::Game(state) => {
                if let Key::Character(text) = &event.logical_key {
                    let text = text.to_lowercase();
                    if pressed {
                        state.held.insert(text);
                    } else {
                        state.held.remove(&text);
                    }
                }
            }
            AppState::Editor(state) => {
                if !pressed {
                    return;
                }
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match key {
                    KeyCode::KeyZ if modifiers.control_key() => state.apply(Action::Undo),
                    KeyCode::KeyY if modifiers.control_key() => state.apply(Action::Redo),
                    KeyCode::F5 => state.save(),
                    KeyCode::F9 => state.load(),
                    _ => {}
                }
            }
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        egui::SidePanel::left("inspector")
            .default_width(240.0)
            .show(ctx, |ui| match self {
                AppState::Game(state) => {
                    let summary = state.scene.summary();
                    ui.heading("Frog v Ducks");
                    ui.separator();
                    ui.label(format!("Tick: {}", summary.tick));
                    ui.label(format!("Sprites: {} ({} dying)", summary.sprites, summary.dying));
                    for (tag, count) in &summary.kinds {
                        ui.label(format!("{}: {count}", tag.name()));
                    }
                    ui.separator();
                    match summary.frog {
                        Some((score, oxygen)) => {
                            ui.label(format!("Score: {score}"));
                            ui.label(format!("Oxygen: {oxygen}"));
                        }
                        None => {
                            ui.label("Hold A, S or D to start");
                        }
                    }
                    ui.separator();
                    ui.small("A/D: turn | S: dive");
                }
                AppState::Editor(state) => {
                    ui.heading("Voxel Editor");
                    ui.separator();
                    let size = state.editor.sprite().size();
                    ui.label(format!("Grid: {size}"));
                    ui.label(format!("Working file: {}", state.working.display()));
                    if state.unsaved {
                        ui.colored_label(egui::Color32::YELLOW, "Unsaved changes");
                    }

                    let color = state.editor.config().paint_color;
                    let mut rgb = [color.r, color.g, color.b];
                    ui.horizontal(|ui| {
                        ui.label("Paint:");
                        ui.color_edit_button_srgb(&mut rgb);
                    });
                    if rgb != [color.r, color.g, color.b] {
                        state.editor.set_paint_color(Rgba::rgb(rgb[0], rgb[1], rgb[2]));
                    }
                    if ui.button("Erase color").clicked() {
                        state.editor.set_paint_color(Rgba::TRANSPARENT);
                    }

                    ui.horizontal(|ui| {
                        if ui.button("Undo (Ctrl+Z)").clicked() {
                            state.apply(Action::Undo);
                        }
                        if ui.button("Redo (Ctrl+Y)").clicked() {
                            state.apply(Action::Redo);
                        }
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Save (F5)").clicked() {
                            state.save();
                        }
                        if ui.button("Load (F9)").clicked() {
                            state.load();
                        }
                    });
                    ui.label(format!(
                        "Undo: {} / Redo: {}",
                        state.editor.undo_count(),
                        state.editor.redo_count()
                    ));
                    ui.separator();
                    ui.small("LMB on a sheet: paint | LMB elsewhere: rotate");
                }
            });
    }
}

/// Renderers created once the GPU is up.
struct Renderers {
    gpu: WgpuDevice,
    sprites: SpriteRenderer,
    sheets: SheetRenderer,
}

impl Renderers {
    fn new(mut gpu: WgpuDevice) -> Result<Self, DeviceError> {
        let sprites = SpriteRenderer::new(&mut gpu)?;
        let sheets = SheetRenderer::new(&mut gpu)?;
        Ok(Self { gpu, sprites, sheets })
    }

    /// Sync atlases and queue every draw for the frame.
    fn queue_frame(&mut self, state: &mut AppState, aspect: f32) -> Result<(), DeviceError> {
        self.sprites.sync_atlases(&mut self.gpu, state.registry_mut())?;
        match state {
            AppState::Game(game) => {
                let camera = game.camera(aspect);
                let sprites = game.scene.sprites().iter().chain(game.scene.hud());
                self.sprites.draw_all(&mut self.gpu, &camera, &game.ctx.registry, sprites)?;
            }
            AppState::Editor(edit) => {
                edit.editor.set_aspect(aspect);
                let camera = edit.camera(aspect);
                let sprite = edit.editor.sprite();
                self.sprites
                    .draw(&mut self.gpu, &camera, &edit.registry, &sprite.to_sprite())?;
                let (Some(atlas), Some(texture)) = (
                    edit.registry.get(sprite.atlas()),
                    self.sprites.textures().get(sprite.atlas()),
                ) else {
                    return Ok(());
                };
                for sheet in sprite.sheets() {
                    self.sheets.draw(
                        &mut self.gpu,
                        edit.editor.projection(),
                        sheet.model(),
                        sheet.z(),
                        texture,
                        atlas.layout(),
                        SubRegion::FULL,
                    )?;
                }
            }
        }
        Ok(())
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderers: Option<Renderers>,
    modifiers: ModifiersState,
    last_frame: Instant,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            surface: None,
            config: None,
            renderers: None,
            modifiers: ModifiersState::empty(),
            last_frame: Instant::now(),
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn aspect(&self) -> f32 {
        self.config
            .as_ref()
            .map(|c| c.width as f32 / c.height.max(1) as f32)
            .unwrap_or(1.0)
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        self.state.update(dt);

        let aspect = self.aspect();
        let (Some(surface), Some(renderers), Some(config), Some(window)) =
            (&self.surface, &mut self.renderers, &self.config, &self.window)
        else {
            return;
        };

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(renderers.gpu.device(), config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(e) = renderers.queue_frame(&mut self.state, aspect) {
            tracing::error!("frame skipped: {e}");
        }
        renderers.gpu.render(
            &view,
            wgpu::Color {
                r: 0.16,
                g: 0.35,
                b: 0.55,
                a: 1.0,
            },
        );

        let (Some(egui_winit), Some(egui_renderer)) = (&mut self.egui_winit, &mut self.egui_renderer) else {
            output.present();
            return;
        };
        let raw_input = egui_winit.take_egui_input(window);
        let state = &mut self.state;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx);
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let device = renderers.gpu.device();
        let queue = renderers.gpu.queue();
        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        output.present();
        window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("voxsprite")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("voxsprite_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);
        let gpu = WgpuDevice::new(device, queue, surface_format, config.width, config.height);
        let renderers = Renderers::new(gpu).expect("compile voxel programs");

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        self.window = Some(window);
        self.surface = Some(surface);
        self.config = Some(config);
        self.renderers = Some(renderers);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let AppState::Editor(state) = &mut self.state {
                    state.save();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(renderers), Some(config)) =
                    (&self.surface, &mut self.renderers, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(renderers.gpu.device(), config);
                    renderers.gpu.resize(config.width, config.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.state.handle_key(&event, self.modifiers);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (AppState::Editor(state), Some(config)) = (&mut self.state, &self.config) {
                    state.cursor = PointerTracker::to_ndc(
                        position.x as f32,
                        position.y as f32,
                        config.width as f32,
                        config.height as f32,
                    );
                    state.feed_pointer();
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: button_state,
                ..
            } => {
                if let AppState::Editor(state) = &mut self.state {
                    state.buttons = match button_state {
                        ElementState::Pressed => state.buttons | PRIMARY_BUTTON,
                        ElementState::Released => state.buttons & !PRIMARY_BUTTON,
                    };
                    state.feed_pointer();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!(mode = ?cli.mode, "voxsprite-desktop starting");

    let state = match cli.mode {
        Mode::Editor => {
            let config = match &cli.config {
                Some(path) => EditorConfig::load(path)?,
                None => EditorConfig::default(),
            };
            AppState::Editor(Box::new(EditorState::new(config, cli.atlas)?))
        }
        Mode::Game => {
            let config = match &cli.config {
                Some(path) => SceneConfig::load(path)?,
                None => SceneConfig::default(),
            };
            AppState::Game(Box::new(GameState::new(config, cli.assets)?))
        }
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state);
    event_loop.run_app(&mut app)?;

    Ok(())
}
