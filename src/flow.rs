//! Game loop and application event handling.
//!
//! A [`Game`] builds its [`Scene`] once in `setup` and is then driven frame
//! by frame. Every redraw runs, strictly in this order:
//! 1. `input` for each window event received since the last frame
//! 2. `logic(dt)`, which may ask to quit
//! 3. the world update: [`Scene::update`] followed by `update_world(dt)`
//! 4. render traversal into a [`DrawList`] and its submission to the GPU
//! 5. present, then sleep off the rest of the frame budget
//!
//! Fatal setup errors stop the event loop and are returned from [`run`].

use std::sync::Arc;

use instant::{Duration, Instant};
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{config::EngineSettings, context::Context, render::DrawList, scene::Scene};

/// Whether the loop keeps running after this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// The hooks a game implements.
#[allow(async_fn_in_trait)]
pub trait Game {
    /// Load assets and build the world. Called once the GPU is ready.
    async fn setup(&mut self, ctx: &Context) -> anyhow::Result<Scene>;

    /// A window event, delivered before the next `logic` call.
    fn input(&mut self, _scene: &mut Scene, _event: &WindowEvent) {}

    /// Per-frame game logic, typically moving the camera and objects.
    fn logic(&mut self, scene: &mut Scene, dt: f32) -> Control;

    /// Runs after the scene advanced its terrain, particles, animations and
    /// day cycle.
    fn update_world(&mut self, _scene: &mut Scene, _dt: f32) {}
}

/// Sleeps off whatever is left of a fixed frame budget. This caps the frame
/// rate; it does not synchronise with the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLimiter {
    budget: Duration,
}

impl FrameLimiter {
    /// `reference_fps == 0` disables the cap.
    pub fn new(reference_fps: u32) -> Self {
        let budget = if reference_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / reference_fps as f64)
        };
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left in the budget after a frame took `elapsed`, or `None` if the
    /// frame ran over.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.budget
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }
}

/// GPU context, world and surface status once the window exists.
struct AppState {
    ctx: Context,
    scene: Scene,
    draw_list: DrawList,
    is_surface_configured: bool,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.scene.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, dt: f32) -> Result<(), wgpu::SurfaceError> {
        if let Some(window) = &self.ctx.window {
            window.request_redraw();
        }
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scene.render(dt, &mut self.draw_list);
        if let Err(e) = self.draw_list.submit(&mut self.ctx, &view) {
            log::error!("Frame submission failed: {e:#}");
        }
        output.present();
        Ok(())
    }
}

pub struct App<G: Game> {
    async_runtime: Runtime,
    settings: EngineSettings,
    game: G,
    state: Option<AppState>,
    limiter: FrameLimiter,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<G: Game> App<G> {
    fn new(game: G, settings: EngineSettings) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: Runtime::new()?,
            limiter: FrameLimiter::new(settings.reference_fps),
            settings,
            game,
            state: None,
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, window: Arc<Window>) -> anyhow::Result<AppState> {
        let settings = self.settings.clone();
        let game = &mut self.game;
        let (ctx, scene) = self.async_runtime.block_on(async move {
            let ctx = Context::new(window, settings).await?;
            let scene = game.setup(&ctx).await?;
            anyhow::Ok((ctx, scene))
        })?;
        Ok(AppState {
            ctx,
            scene,
            draw_list: DrawList::new(),
            is_surface_configured: true,
        })
    }
}

impl<G: Game> ApplicationHandler for App<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let (width, height) = self.settings.window_size;
        let window_attributes = Window::default_attributes()
            .with_title(self.settings.window_title.clone())
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match self.init(window.clone()) {
            Ok(state) => {
                self.state = Some(state);
                self.last_time = Instant::now();
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e.context("setting up the game")),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        self.game.input(&mut state.scene, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let frame_start = Instant::now();
                let dt = self.last_time.elapsed().as_secs_f32();
                self.last_time = frame_start;

                if self.game.logic(&mut state.scene, dt) == Control::Quit {
                    event_loop.exit();
                    return;
                }
                state.scene.update(dt);
                self.game.update_world(&mut state.scene, dt);

                match state.render(dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (width, height) = state.ctx.size();
                        state.resize(width, height);
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }

                if let Some(rest) = self.limiter.remaining(frame_start.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
            _ => {}
        }
    }
}

/// Open a window, set up `game` and run it until it quits or the window
/// closes. Setup errors are returned once the event loop has stopped.
pub fn run<G: Game>(game: G, settings: EngineSettings) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<()> = EventLoop::builder().build()?;

    let mut app = App::new(game, settings)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Render one frame of `scene` offscreen and read it back. Used by the GPU
/// tests together with [`Context::headless`].
#[cfg(feature = "integration-tests")]
pub fn render_to_image(ctx: &mut Context, scene: &Scene) -> anyhow::Result<image::RgbaImage> {
    use std::iter;

    use anyhow::Context as _;

    let (width, height) = ctx.size();
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.config.format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut draw_list = DrawList::new();
    scene.render(0.0, &mut draw_list);
    draw_list.submit(ctx, &view)?;

    // rows of a texture copy must be 256 byte aligned
    let unpadded = 4 * width;
    let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Offscreen Readback"),
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        extent,
    );
    ctx.queue.submit(iter::once(encoder.finish()));

    let (tx, rx) = futures::channel::oneshot::channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(Duration::from_secs(3)),
    })?;
    futures::executor::block_on(rx)
        .context("readback was cancelled")?
        .context("mapping the readback buffer")?;

    let data = buffer_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in data.chunks_exact(padded as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(data);
    output_buffer.unmap();
    image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong size")
}
