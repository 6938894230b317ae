// =============================================================================
// IRO - Vulkan frame orchestration demo
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  App (winit event loop, input, FPS title)                       │
// │    └── Renderer (frame slots, begin/end protocol)               │
// │          └── Swapchain (images, framebuffers, recreation)       │
// │                └── VulkanDevice (instance, queues, allocator)   │
// │    └── UiRegistry (named primitives -> draw items)              │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Animate the scene, upload dirty geometry
// 2. begin_frame: wait for the slot's fence, acquire an image
// 3. Record the render pass and one draw per primitive
// 4. end_frame: submit, present, recreate the swapchain if needed
//
// =============================================================================

mod backend;
mod config;
mod error;
mod renderer;
mod ui;

use anyhow::{Context, Result};
use ash::vk;
use glam::{Vec2, Vec4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

use backend::{ShaderSet, VulkanDevice};
use config::Config;
use renderer::{Renderer, SurfaceSource};
use ui::{rgba_to_aabbggrr, Primitive, UiRegistry};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting Iro renderer");
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.fullscreen { "fullscreen" } else { "windowed" }
    );
    log::info!("Present mode: {}", config.graphics.present_mode);

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Log level comes from the config; RUST_LOG overrides it
fn init_logging(config: &Config) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = config
        .debug
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    builder.init();
}

// =============================================================================
// WINDOW SURFACE
// =============================================================================

/// The window as the renderer sees it: a size and a resize flag
struct WindowSurface {
    window: Arc<Window>,
    resized: AtomicBool,
}

impl WindowSurface {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            resized: AtomicBool::new(false),
        }
    }

    fn request_resize(&self) {
        self.resized.store(true, Ordering::Relaxed);
    }
}

impl SurfaceSource for WindowSurface {
    fn drawable_extent(&self) -> vk::Extent2D {
        let size = self.window.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn take_resize_request(&self) -> bool {
        self.resized.swap(false, Ordering::Relaxed)
    }
}

// =============================================================================
// GRAPHICS STATE
// =============================================================================

/// Everything tied to the window's Vulkan surface.
///
/// IMPORTANT: Field order matters for Drop! The renderer goes first: its
/// Drop waits for the device to go idle, so frames still in flight are done
/// with the primitive buffers before those are freed. The device goes
/// after both, the window last.
struct Graphics {
    renderer: Renderer<VulkanDevice, WindowSurface>,
    ui: UiRegistry,
    device: Arc<VulkanDevice>,
    surface: Arc<WindowSurface>,
}

impl Graphics {
    fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let device = VulkanDevice::new(
            &config.window.title,
            config.debug.validation_layers,
            &*window,
        )
        .context("Failed to create Vulkan device")?;

        let shaders = ShaderSet::load(&config.shaders.vertex, &config.shaders.fragment)
            .context("Failed to load shaders (was glslc available at build time?)")?;

        let surface = Arc::new(WindowSurface::new(window));
        let renderer = Renderer::new(device.clone(), surface.clone(), config.renderer(), shaders)
            .context("Failed to create renderer")?;

        Ok(Self {
            renderer,
            ui: demo_scene(),
            device,
            surface,
        })
    }

    /// Render one frame. Returns false if the frame was skipped.
    fn render(&mut self, elapsed: f32) -> Result<bool> {
        animate(&mut self.ui, elapsed);
        self.ui.upload_dirty(&self.device)?;

        let Some(cmd) = self.renderer.begin_frame()? else {
            return Ok(false);
        };

        self.renderer.begin_render_pass(cmd)?;
        for item in self.ui.draw_items() {
            self.renderer.draw(cmd, &item)?;
        }
        self.renderer.end_render_pass(cmd)?;
        self.renderer.end_frame()?;

        Ok(true)
    }

    fn window(&self) -> &Window {
        &self.surface.window
    }
}

// =============================================================================
// DEMO SCENE
// =============================================================================

fn demo_scene() -> UiRegistry {
    let mut ui = UiRegistry::new();

    let mut triangle = Primitive::triangle();
    triangle.set_position(Vec2::new(-0.45, 0.0));
    triangle.set_scale(Vec2::splat(0.6));
    ui.add("triangle", triangle);

    // Corners: bottom-left, bottom-right, top-right, top-left
    let mut quad = Primitive::quad();
    quad.set_colors(&[
        rgba_to_aabbggrr(Vec4::new(1.0, 0.0, 0.0, 1.0)),
        rgba_to_aabbggrr(Vec4::new(0.0, 1.0, 0.0, 1.0)),
        rgba_to_aabbggrr(Vec4::new(0.0, 0.0, 1.0, 1.0)),
        rgba_to_aabbggrr(Vec4::ONE),
    ]);
    quad.set_position(Vec2::new(0.45, 0.0));
    quad.set_scale(Vec2::splat(0.6));
    ui.add("quad", quad);

    ui
}

fn animate(ui: &mut UiRegistry, elapsed: f32) {
    if let Some(quad) = ui.get_mut("quad") {
        quad.set_position(Vec2::new(0.45, 0.25 * elapsed.sin()));
    }
    if let Some(triangle) = ui.get_mut("triangle") {
        triangle.set_scale(Vec2::splat(0.6 + 0.1 * (elapsed * 2.0).sin()));
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    graphics: Option<Graphics>,
    is_fullscreen: bool,
    /// First fatal error; ends the event loop and is returned from main
    error: Option<anyhow::Error>,

    // FPS tracking
    started: Instant,
    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let is_fullscreen = config.window.fullscreen;
        let now = Instant::now();
        Self {
            config,
            graphics: None,
            is_fullscreen,
            error: None,
            started: now,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        // Tear down while the window still exists
        self.graphics = None;
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    // =========================================================================
    // FULLSCREEN TOGGLE
    // =========================================================================

    fn toggle_fullscreen(&mut self) {
        let Some(graphics) = &self.graphics else {
            return;
        };
        self.is_fullscreen = !self.is_fullscreen;

        if self.is_fullscreen {
            graphics
                .window()
                .set_fullscreen(Some(Fullscreen::Borderless(None)));
            log::info!("Entered fullscreen mode");
        } else {
            graphics.window().set_fullscreen(None);
            log::info!("Exited fullscreen mode");
        }

        graphics.surface.request_resize();
    }

    // =========================================================================
    // FPS TRACKING
    // =========================================================================

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        // Update title every second
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;

            if let Some(graphics) = &self.graphics {
                let mode = if self.is_fullscreen { "fullscreen" } else { "windowed" };
                graphics.window().set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms) [{}]",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0,
                    mode
                ));
            }

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }

        let mut window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_resizable(self.config.window.resizable)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        if self.config.window.fullscreen {
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                return;
            }
        };

        match Graphics::new(window, &self.config) {
            Ok(graphics) => self.graphics = Some(graphics),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                if let Some(graphics) = &self.graphics {
                    if let Err(e) = graphics.device.wait_idle() {
                        log::warn!("Failed to wait for idle on close: {}", e);
                    }
                }
                self.graphics = None;
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(graphics) = &self.graphics {
                    graphics.surface.request_resize();
                }
            }

            WindowEvent::RedrawRequested => {
                let elapsed = self.started.elapsed().as_secs_f32();
                let Some(graphics) = self.graphics.as_mut() else {
                    return;
                };
                match graphics.render(elapsed) {
                    Ok(true) => self.update_fps(),
                    Ok(false) => {}
                    Err(e) => self.fail(event_loop, e.context("Frame failed")),
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if !event.state.is_pressed() {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        log::info!("ESC pressed, exiting...");
                        self.graphics = None;
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::F11) => self.toggle_fullscreen(),
                    _ => {}
                }
            }

            _ => {}
        }
    }

    /// Keep redrawing continuously, except while minimized
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(graphics) = &self.graphics {
            let size = graphics.window().inner_size();
            if size.width > 0 && size.height > 0 {
                graphics.window().request_redraw();
            }
        }
    }
}
