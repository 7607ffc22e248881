use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    config::EngineSettings,
    data_structures::texture,
    pipelines::{Layouts, Pipelines, frame::FrameResources},
};

/// Format of the offscreen target when rendering without a window.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// GPU state shared by everything that uploads or draws: device, queue,
/// surface, layouts, pipelines and the per-frame uniform buffers.
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub settings: EngineSettings,
    pub layouts: Layouts,
    pub pipelines: Pipelines,
    pub(crate) frame: FrameResources,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: EngineSettings) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter for this surface")?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an sRGB surface; anything else comes out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Self::assemble(Some(window), Some(surface), device, queue, config, settings)
    }

    /// A context without window or surface. Frames are rendered into
    /// caller-provided textures of [`HEADLESS_FORMAT`].
    pub async fn headless(settings: EngineSettings, width: u32, height: u32) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter available")?;
        let (device, queue) = request_device(&adapter).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: HEADLESS_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Self::assemble(None, None, device, queue, config, settings)
    }

    fn assemble(
        window: Option<Arc<Window>>,
        surface: Option<wgpu::Surface<'static>>,
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: wgpu::SurfaceConfiguration,
        settings: EngineSettings,
    ) -> anyhow::Result<Self> {
        if let Some(surface) = &surface {
            surface.configure(&device, &config);
        }
        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, config.format, &layouts);
        let frame = FrameResources::new(&device, &queue, &layouts)?;
        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            settings,
            layouts,
            pipelines,
            frame,
        })
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure the surface and recreate the depth texture. Zero sized
    /// requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        self.depth_texture = texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await
        .context("requesting graphics device")
}
