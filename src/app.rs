use std::{cell::RefCell, collections::HashMap, process, rc::Rc, sync::Arc};

use anyhow::bail;
use wgpu::{
    Adapter, Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Color, ColorTargetState, ColorWrites, Device, DeviceDescriptor, Extent3d, FilterMode,
    FragmentState, InstanceDescriptor, LoadOp, MemoryHints, MultisampleState, Operations,
    Origin3d, PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState,
    PrimitiveTopology, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, Sampler, SamplerBindingType,
    SamplerDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceError, SurfaceTarget, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture,
    TextureAspect, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureViewDimension, VertexState,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::{
    canvas::Canvas,
    config::Config,
    input::{Pointer, PointerTracker},
    math::{vec2, Vec2f},
    raster::Raster,
    view::View,
};

const TITLE: &str = "Drawing Application";

/// Owns the shared canvas and one window per view.
pub struct App {
    config: Config,
    canvas: Rc<RefCell<Canvas>>,
    instance: wgpu::Instance,
    /// Created together with the first window, since picking an adapter needs a surface.
    gpu: Option<Gpu>,
    wins: HashMap<WindowId, Win>,
    opened: bool,
}

struct Gpu {
    adapter: Adapter,
    device: Device,
    queue: Queue,
    /// Format of every window surface.
    surface_format: TextureFormat,
    /// Format of the per-window frame textures; sRGB iff the surface is.
    texture_format: TextureFormat,

    render_pipeline: RenderPipeline,
    frame_bgl: BindGroupLayout,
    sampler: Sampler,
}

impl Gpu {
    fn new(instance: &wgpu::Instance, surface: &Surface<'_>) -> anyhow::Result<Self> {
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            compatible_surface: Some(surface),
            ..Default::default()
        }))?;

        let caps = surface.get_capabilities(&adapter);
        let Some(&surface_format) = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
        else {
            bail!("graphics adapter cannot present to the window surface");
        };
        let texture_format = if surface_format.is_srgb() {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            memory_hints: MemoryHints::MemoryUsage,
            ..Default::default()
        }))?;

        log::debug!(
            "using adapter {:?} (surface format: {:?})",
            adapter.get_info().name,
            surface_format
        );

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let frame_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    count: None,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    count: None,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                },
            ],
        });

        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("frame_pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("frame_pipeline"),
                bind_group_layouts: &[&frame_bgl],
                ..Default::default()
            })),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vertex"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fragment"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::all(),
                })],
            }),
            multiview: None,
            cache: None,
        });

        // The frame is shown 1:1, so there is nothing to filter.
        let sampler = device.create_sampler(&SamplerDescriptor {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Gpu {
            adapter,
            device,
            queue,
            surface_format,
            texture_format,
            render_pipeline,
            frame_bgl,
            sampler,
        })
    }

    /// Uploads `raster` into `texture` with its top-left corner at row `y`.
    fn upload(&self, texture: &Texture, y: u32, raster: &Raster) {
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: Origin3d { x: 0, y, z: 0 },
                aspect: TextureAspect::All,
            },
            raster.as_bytes(),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * raster.width()),
                rows_per_image: Some(raster.height()),
            },
            Extent3d {
                width: raster.width(),
                height: raster.height(),
                depth_or_array_layers: 1,
            },
        );
    }
}

struct Win {
    window: Arc<Window>,
    surface: Surface<'static>,
    /// Drawing area on top, toolbar below.
    frame_texture: Texture,
    frame_bg: BindGroup,

    view: View,
    input: PointerTracker,
}

impl Win {
    fn new(
        gpu: &Gpu,
        window: Arc<Window>,
        surface: Surface<'static>,
        view: View,
    ) -> anyhow::Result<Self> {
        let caps = surface.get_capabilities(&gpu.adapter);
        if !caps.formats.contains(&gpu.surface_format) {
            bail!(
                "window surface does not support format {:?} (supported: {:?})",
                gpu.surface_format,
                caps.formats,
            );
        }

        let (width, height) = view.window_size();
        let frame_texture = gpu.device.create_texture(&TextureDescriptor {
            label: Some("frame"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: gpu.texture_format,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let frame_bg = gpu.device.create_bind_group(&BindGroupDescriptor {
            label: Some("frame"),
            layout: &gpu.frame_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::Sampler(&gpu.sampler),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(
                        &frame_texture.create_view(&Default::default()),
                    ),
                },
            ],
        });

        // The toolbar never changes, so it is uploaded once.
        gpu.upload(
            &frame_texture,
            view.canvas_size().1,
            &view.toolbar().render(),
        );

        let win = Win {
            window,
            surface,
            frame_texture,
            frame_bg,
            view,
            input: PointerTracker::default(),
        };
        win.recreate_swapchain(gpu)?;
        Ok(win)
    }

    fn recreate_swapchain(&self, gpu: &Gpu) -> anyhow::Result<()> {
        let res = self.window.inner_size();

        let Some(mut config) =
            self.surface
                .get_default_config(&gpu.adapter, res.width.max(1), res.height.max(1))
        else {
            bail!("adapter does not support the window surface");
        };
        config.format = gpu.surface_format;

        log::debug!(
            "configuring window surface for {}x{} (format: {:?}, present mode: {:?})",
            config.width,
            config.height,
            config.format,
            config.present_mode,
        );

        self.surface.configure(&gpu.device, &config);
        Ok(())
    }

    fn redraw(&mut self, gpu: &Gpu) -> anyhow::Result<()> {
        let st = match self.surface.get_current_texture() {
            Ok(st) => st,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.recreate_swapchain(gpu)?;
                self.surface.get_current_texture()?
            }
            Err(e) => bail!("failed to acquire frame: {e}"),
        };

        gpu.upload(&self.frame_texture, 0, &self.view.frame().image());

        let mut enc = gpu.device.create_command_encoder(&Default::default());
        {
            let target = st.texture.create_view(&Default::default());
            let mut pass = enc.begin_render_pass(&RenderPassDescriptor {
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&gpu.render_pipeline);
            pass.set_bind_group(0, &self.frame_bg, &[]);
            pass.draw(0..3, 0..1);
        }

        gpu.queue.submit([enc.finish()]);
        self.window.pre_present_notify();
        st.present();
        Ok(())
    }

    /// Maps a pointer position from window pixels to frame pixels, in case the window manager
    /// did not grant the requested size.
    fn to_frame(&self, pointer: Pointer) -> Pointer {
        let size = self.window.inner_size();
        let (width, height) = self.view.window_size();
        let scale = |pos: Vec2f| {
            if size.width == 0 || size.height == 0 {
                return pos;
            }
            vec2(
                pos.x() * width as f32 / size.width as f32,
                pos.y() * height as f32 / size.height as f32,
            )
        };
        match pointer {
            Pointer::Press(pos) => Pointer::Press(scale(pos)),
            Pointer::Drag(pos) => Pointer::Drag(scale(pos)),
            Pointer::Release => Pointer::Release,
        }
    }
}

impl App {
    pub fn new(config: Config) -> Self {
        let (width, height) = (config.canvas.width, config.canvas.height);
        let canvas = match config.canvas.brush_radius {
            Some(radius) => Canvas::with_brush(width, height, radius),
            None => Canvas::new(width, height),
        };
        Self {
            config,
            canvas: Rc::new(RefCell::new(canvas)),
            instance: wgpu::Instance::new(&InstanceDescriptor {
                backends: Backends::PRIMARY,
                ..Default::default()
            }),
            gpu: None,
            wins: HashMap::new(),
            opened: false,
        }
    }

    fn open_windows(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = PhysicalSize::new(
            self.config.canvas.width,
            self.config.canvas.height + self.config.toolbar.height,
        );
        log::debug!(
            "opening {} windows at {}x{}",
            self.config.windows,
            size.width,
            size.height
        );

        for _ in 0..self.config.windows {
            let window = Arc::new(
                event_loop.create_window(
                    Window::default_attributes()
                        .with_title(TITLE)
                        .with_inner_size(size)
                        .with_resizable(false),
                )?,
            );
            let surface = self
                .instance
                .create_surface(SurfaceTarget::from(window.clone()))?;
            if self.gpu.is_none() {
                self.gpu = Some(Gpu::new(&self.instance, &surface)?);
            }
            let Some(gpu) = &self.gpu else { continue };

            let redraw = window.clone();
            let view = View::new(self.canvas.clone(), &self.config, move || {
                redraw.request_redraw()
            });
            let id = window.id();
            let win = Win::new(gpu, window, surface, view)?;
            win.window.request_redraw();
            self.wins.insert(id, win);
            log::info!("opened window {id:?}");
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.opened {
            self.opened = true;
            if let Err(e) = self.open_windows(event_loop) {
                eprintln!("could not create window: {e}");
                process::exit(1);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            // Dropping the window also drops its view, which stops its broadcasts.
            self.wins.remove(&window_id);
            log::info!(
                "closed window {window_id:?} ({} remaining)",
                self.wins.len()
            );
            if self.wins.is_empty() {
                event_loop.exit();
            }
            return;
        }

        let (Some(win), Some(gpu)) = (self.wins.get_mut(&window_id), &self.gpu) else {
            return;
        };

        match event {
            WindowEvent::RedrawRequested => {
                if let Err(e) = win.redraw(gpu) {
                    log::error!("failed to redraw {window_id:?}: {e}");
                }
            }
            WindowEvent::Resized(_) => {
                if let Err(e) = win.recreate_swapchain(gpu) {
                    log::error!("failed to reconfigure {window_id:?}: {e}");
                }
                win.window.request_redraw();
            }
            event => {
                let Some(pointer) = win.input.translate(&event) else {
                    return;
                };
                let pointer = win.to_frame(pointer);
                if let Err(e) = win.view.pointer(pointer) {
                    log::error!("{pointer:?} in {window_id:?} failed: {e}");
                }
            }
        }
    }
}
