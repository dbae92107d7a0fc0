use std::{mem, sync::Arc};

use anyhow::Context;
use bytemuck::NoUninit;
use wgpu::{
    util::{DeviceExt, TextureDataOrder},
    Adapter, Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBindingType, BufferDescriptor, BufferUsages, Color, ColorTargetState,
    ColorWrites, CommandEncoder, Device, DeviceDescriptor, Extent3d, FilterMode, FragmentState,
    InstanceDescriptor, LoadOp, MemoryHints, MultisampleState, Operations,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState, PrimitiveTopology,
    Queue, RenderPass, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, SamplerBindingType, SamplerDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, SurfaceTarget, Texture, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureViewDimension, VertexState,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    cmd::Cmd,
    color::Rgb,
    config,
    error::Error,
    math::{lerp, vec2, Vec2f, Vec2u},
    worker::{self, Job},
};

/// Side length of the generated brush texture.
const BRUSH_TEXELS: u32 = 32;
/// On-screen size of the pen cursor, in pixels.
const CURSOR_PX: f32 = 9.0;
const CURSOR_COLOR: Rgb = Rgb::new(40, 40, 40);

pub struct App {
    instance: wgpu::Instance,
    window_config: config::Window,
    proxy: EventLoopProxy<Cmd>,
    /// Handed to the drawing thread once the window exists.
    job: Option<Job>,
    win: Option<Win>,
    finished: bool,
    error: Option<anyhow::Error>,
}

struct Gpu {
    device: Device,
    queue: Queue,
    /// Surface configuration; its format is used for every render target.
    config: SurfaceConfiguration,

    render_pipeline: RenderPipeline,
    sampler_bg: BindGroup,

    texture_bgl: BindGroupLayout,
    uniforms_bgl: BindGroupLayout,
    instances_bgl: BindGroupLayout,
}

impl Gpu {
    fn new(
        instance: &wgpu::Instance,
        surface: &Surface<'_>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let adapter: Adapter =
            pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
                compatible_surface: Some(surface),
                ..Default::default()
            }))
            .context("failed to find a supported graphics adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            memory_hints: MemoryHints::MemoryUsage,
            ..Default::default()
        }))
        .context("failed to open the graphics device")?;

        let config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .context("graphics adapter does not support the window surface")?;

        // Shader
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let sampler_bgl = single_entry_bgl(
            &device,
            "sampler",
            ShaderStages::FRAGMENT,
            BindingType::Sampler(SamplerBindingType::Filtering),
        );
        let texture_bgl = single_entry_bgl(
            &device,
            "texture",
            ShaderStages::FRAGMENT,
            BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
        );
        let uniforms_bgl = single_entry_bgl(
            &device,
            "uniforms",
            ShaderStages::VERTEX,
            buffer_binding(BufferBindingType::Uniform),
        );
        let instances_bgl = single_entry_bgl(
            &device,
            "instances",
            ShaderStages::VERTEX,
            buffer_binding(BufferBindingType::Storage { read_only: true }),
        );

        // Pipeline.
        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("main_render_pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("main_render_pipeline"),
                bind_group_layouts: &[&sampler_bgl, &texture_bgl, &uniforms_bgl, &instances_bgl],
                push_constant_ranges: &[],
            })),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vertex"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fragment"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: config.format,
                    blend: Some(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let sampler_bg =
            single_entry_bg(&device, &sampler_bgl, BindingResource::Sampler(&sampler));

        Ok(Gpu {
            device,
            queue,
            config,
            render_pipeline,
            sampler_bg,
            texture_bgl,
            uniforms_bgl,
            instances_bgl,
        })
    }

    /// Whether the render targets apply the sRGB transfer curve on write.
    fn linear_colors(&self) -> bool {
        self.config.format.is_srgb()
    }

    fn tint(&self, color: Rgb) -> [f32; 4] {
        let [r, g, b] = color.to_f32(self.linear_colors());
        [r, g, b, 1.0]
    }
}

fn single_entry_bgl(
    device: &Device,
    label: &str,
    visibility: ShaderStages,
    ty: BindingType,
) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            count: None,
            visibility,
            ty,
        }],
    })
}

fn single_entry_bg(
    device: &Device,
    layout: &BindGroupLayout,
    resource: BindingResource<'_>,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: None,
        layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource,
        }],
    })
}

fn buffer_binding(ty: BufferBindingType) -> BindingType {
    BindingType::Buffer {
        ty,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

struct Win {
    window: Arc<Window>,
    surface: Surface<'static>,
    gpu: Gpu,

    canvas: Drawable,
    brush: Drawable,
    cursor_draw: Drawable,

    background: Color,
    /// Pen position in turtle coordinates.
    cursor_pos: Vec2f,
    stroke: Stroke,
}

impl Win {
    fn recreate_swapchain(&mut self) {
        let res = self.window.inner_size();
        if res.width == 0 || res.height == 0 {
            // Minimized; keep the old configuration until the window comes back.
            return;
        }

        self.gpu.config.width = res.width;
        self.gpu.config.height = res.height;

        log::debug!(
            "configuring window surface for {}x{} (format: {:?}, present mode: {:?}, alpha mode: {:?})",
            res.width,
            res.height,
            self.gpu.config.format,
            self.gpu.config.present_mode,
            self.gpu.config.alpha_mode,
        );

        self.surface.configure(&self.gpu.device, &self.gpu.config);
    }

    fn redraw(&mut self) {
        let st = match self.surface.get_current_texture() {
            Ok(st) => st,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.recreate_swapchain();
                match self.surface.get_current_texture() {
                    Ok(st) => st,
                    Err(e) => {
                        log::warn!("failed to acquire frame after recreating swapchain: {e}");
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("failed to acquire frame: {e}");
                return;
            }
        };

        let size = self.window.inner_size();
        let center = vec2(size.width as f32 * 0.5, size.height as f32 * 0.5);
        let canvas_size = self.canvas.size();
        self.canvas
            .set_single(&self.gpu, Instance::new(center, canvas_size, [1.0; 4]));
        let cursor = center + flip_y(self.cursor_pos);
        self.cursor_draw.set_single(
            &self.gpu,
            Instance::new(
                cursor,
                vec2(CURSOR_PX, CURSOR_PX),
                self.gpu.tint(CURSOR_COLOR),
            ),
        );

        let mut enc = self.gpu.device.create_command_encoder(&Default::default());

        self.stroke.put_impressions(&self.gpu, &mut self.brush);

        let mut pass = Pass::new(&self.gpu, &mut enc, &self.canvas.texture, None);
        self.brush.draw(&mut pass);
        drop(pass);

        // Draw the canvas and cursor onto the window surface.
        let mut pass = Pass::new(&self.gpu, &mut enc, &st.texture, Some(self.background));
        self.canvas.draw(&mut pass);
        self.cursor_draw.draw(&mut pass);
        drop(pass);

        self.gpu.queue.submit([enc.finish()]);
        self.window.pre_present_notify();
        st.present();
    }

    /// Maps turtle coordinates (origin at the centre, y up) to canvas pixels.
    fn to_canvas(&self, pos: Vec2f) -> Vec2f {
        self.canvas.size() * 0.5 + flip_y(pos)
    }
}

fn flip_y(pos: Vec2f) -> Vec2f {
    vec2(pos.x(), -pos.y())
}

impl App {
    pub fn new(window_config: config::Window, job: Job, proxy: EventLoopProxy<Cmd>) -> Self {
        Self {
            instance: wgpu::Instance::new(&InstanceDescriptor {
                backends: Backends::PRIMARY,
                ..Default::default()
            }),
            window_config,
            proxy,
            job: Some(job),
            win: None,
            finished: false,
            error: None,
        }
    }

    /// The error that ended the event loop, if any.
    pub fn finish(self) -> anyhow::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_win(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Win> {
        let cfg = &self.window_config;
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_inner_size(PhysicalSize::new(cfg.width, cfg.height))
                    .with_title(cfg.title.clone()),
            )?,
        );

        let surface = self
            .instance
            .create_surface(SurfaceTarget::from(window.clone()))?;
        let res = window.inner_size();
        let gpu = Gpu::new(&self.instance, &surface, res.width, res.height)?;
        surface.configure(&gpu.device, &gpu.config);

        log::debug!(
            "creating canvas at {}x{}, format={:?}",
            cfg.width,
            cfg.height,
            gpu.config.format
        );
        let canvas = Drawable::empty(&gpu, cfg.width, cfg.height);

        let brush_texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &TextureDescriptor {
                label: Some("brush"),
                size: Extent3d {
                    width: BRUSH_TEXELS,
                    height: BRUSH_TEXELS,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: TextureFormat::Rgba8Unorm,
                usage: TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            TextureDataOrder::MipMajor,
            &disk_texels(BRUSH_TEXELS),
        );
        let brush = Drawable::from_texture(&gpu, brush_texture.clone());
        let cursor_draw = Drawable::from_texture(&gpu, brush_texture);

        let [r, g, b] = cfg.background.to_f32(gpu.linear_colors());
        let background = Color {
            r: r.into(),
            g: g.into(),
            b: b.into(),
            a: 1.0,
        };

        Ok(Win {
            window,
            surface,
            gpu,
            canvas,
            brush,
            cursor_draw,
            background,
            cursor_pos: vec2(0.0, 0.0),
            stroke: Stroke::new(vec2(cfg.width as f32, cfg.height as f32)),
        })
    }
}

impl ApplicationHandler<Cmd> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.win.is_some() {
            return;
        }

        match self.create_win(event_loop) {
            Ok(win) => {
                win.window.request_redraw();
                self.win = Some(win);
            }
            Err(e) => {
                self.error = Some(Error::surface(format!("{e:#}")).into());
                event_loop.exit();
                return;
            }
        }

        if let Some(job) = self.job.take() {
            log::info!("drawing {} (seed {})", job.pattern, job.seed);
            worker::spawn(job, self.proxy.clone());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(win) = &mut self.win else { return };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => win.redraw(),
            WindowEvent::Resized(_) => {
                win.recreate_swapchain();
                win.window.request_redraw();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            } => {
                if self.finished {
                    log::info!("click received, closing");
                    event_loop.exit();
                } else {
                    log::debug!("ignoring click while still drawing");
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: Cmd) {
        let Some(win) = &mut self.win else { return };
        win.window.request_redraw();

        match event {
            Cmd::Segment {
                from,
                to,
                color,
                width,
            } => {
                let from = win.to_canvas(from);
                let to_px = win.to_canvas(to);
                let tint = win.gpu.tint(color);
                win.stroke.append_segment(from, to_px, width as f32, tint);
                win.cursor_pos = to;
            }
            Cmd::Cursor { position, heading } => {
                log::trace!("pen at {position:?}, heading {heading}");
                win.cursor_pos = position;
            }
            Cmd::Finished => {
                self.finished = true;
                log::info!("done; click the window to close it");
            }
        }
    }
}

/// Round brush stamps queued for the canvas.
struct Stroke {
    /// Queued impressions that should be drawn on the next frame.
    impressions: Vec<Instance>,
    /// Canvas size in pixels. Stamps are only placed where they can touch the canvas.
    bounds: Vec2f,
}

impl Stroke {
    /// Brush stamps are spaced this fraction of the pen width apart.
    const SPACING: f32 = 0.25;
    /// Smallest stamp spacing, in pixels.
    const MIN_SPACING_PX: f32 = 0.5;
    /// Smallest stamp diameter, in pixels, so that 1-wide lines stay visible.
    const MIN_DIAMETER_PX: f32 = 1.5;

    fn new(bounds: Vec2f) -> Self {
        Self {
            impressions: Vec::new(),
            bounds,
        }
    }

    /// Places impressions along the segment from `from` to `to` (in canvas pixels), including
    /// both ends, which gives the line round caps.
    fn append_segment(&mut self, from: Vec2f, to: Vec2f, width: f32, color: [f32; 4]) {
        let diameter = width.max(Self::MIN_DIAMETER_PX);
        let spacing = (width * Self::SPACING).max(Self::MIN_SPACING_PX);
        let size = vec2(diameter, diameter);

        let margin = vec2(diameter, diameter);
        let Some((from, to)) = clip_segment(from, to, margin * -1.0, self.bounds + margin) else {
            return;
        };

        let n = (from.dist(to) / spacing).ceil() as usize;
        if n == 0 {
            self.impressions.push(Instance::new(from, size, color));
            return;
        }
        for i in 0..=n {
            let t = i as f32 / n as f32;
            let pos = lerp(from..=to, t);
            self.impressions.push(Instance::new(pos, size, color));
        }
    }

    /// Schedules the queued impressions to be drawn with `brush`.
    fn put_impressions(&mut self, gpu: &Gpu, brush: &mut Drawable) {
        brush.set_instances(gpu, &self.impressions);
        self.impressions.clear();
    }
}

/// Clips the segment `from`-`to` to the axis-aligned box `lo..=hi` (Liang-Barsky).
///
/// Returns `None` if no part of the segment lies inside the box.
fn clip_segment(from: Vec2f, to: Vec2f, lo: Vec2f, hi: Vec2f) -> Option<(Vec2f, Vec2f)> {
    let d = to - from;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    let edges = [
        (-d.x(), from.x() - lo.x()),
        (d.x(), hi.x() - from.x()),
        (-d.y(), from.y() - lo.y()),
        (d.y(), hi.y() - from.y()),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let start = if t0 > 0.0 { lerp(from..=to, t0) } else { from };
    let end = if t1 < 1.0 { lerp(from..=to, t1) } else { to };
    Some((start, end))
}

/// RGBA texels of an anti-aliased white disk filling a `size`×`size` square, premultiplied.
fn disk_texels(size: u32) -> Vec<u8> {
    let radius = size as f32 / 2.0;
    let mut texels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let center = vec2(x as f32 + 0.5, y as f32 + 0.5);
            let dist = center.dist(vec2(radius, radius));
            let coverage = (radius - dist + 0.5).clamp(0.0, 1.0);
            let v = (coverage * 255.0).round() as u8;
            texels.extend_from_slice(&[v; 4]);
        }
    }
    texels
}

#[derive(Clone, Copy, NoUninit)]
#[repr(C)]
struct Uniforms {
    render_target_size: Vec2u,
}

#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
#[repr(C)]
struct Instance {
    /// Center position in pixel coordinates.
    pos: Vec2f,
    size: Vec2f,
    /// Premultiplied RGBA.
    color: [f32; 4],
}

impl Instance {
    fn new(pos: Vec2f, size: Vec2f, color: [f32; 4]) -> Self {
        Self { pos, size, color }
    }
}

struct Pass<'a> {
    gpu: &'a Gpu,
    pass: RenderPass<'a>,
    render_target_size: Vec2u,
}

impl<'a> Pass<'a> {
    fn new(
        gpu: &'a Gpu,
        enc: &'a mut CommandEncoder,
        target: &Texture,
        clear: Option<Color>,
    ) -> Self {
        let pass = enc.begin_render_pass(&RenderPassDescriptor {
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &target.create_view(&Default::default()),
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: if let Some(clear) = clear {
                        LoadOp::Clear(clear)
                    } else {
                        LoadOp::Load
                    },
                    store: StoreOp::Store,
                },
            })],
            ..Default::default()
        });

        Self {
            gpu,
            pass,
            render_target_size: vec2(target.width(), target.height()),
        }
    }
}

struct Drawable {
    texture: Texture,
    uniform_buf: Buffer,
    instance_buf: Buffer,
    texture_bg: BindGroup,
    uniforms_bg: BindGroup,
    instances_bg: BindGroup,
    instance_count: u32,
}

impl Drawable {
    fn empty(gpu: &Gpu, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&TextureDescriptor {
            label: Some("canvas"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: gpu.config.format,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self::from_texture(gpu, texture)
    }

    fn from_texture(gpu: &Gpu, texture: Texture) -> Self {
        let uniform_buf = gpu.device.create_buffer(&BufferDescriptor {
            label: None,
            size: mem::size_of::<Uniforms>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let instance_buf = gpu.device.create_buffer(&BufferDescriptor {
            label: None,
            size: mem::size_of::<Instance>() as u64, // 1 instance preallocated
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view = texture.create_view(&Default::default());
        let texture_bg = single_entry_bg(
            &gpu.device,
            &gpu.texture_bgl,
            BindingResource::TextureView(&view),
        );
        let uniforms_bg =
            single_entry_bg(&gpu.device, &gpu.uniforms_bgl, uniform_buf.as_entire_binding());
        let instances_bg =
            single_entry_bg(&gpu.device, &gpu.instances_bgl, instance_buf.as_entire_binding());

        Self {
            texture,
            uniform_buf,
            instance_buf,
            texture_bg,
            uniforms_bg,
            instances_bg,
            instance_count: 0,
        }
    }

    fn size(&self) -> Vec2f {
        vec2(self.texture.width() as f32, self.texture.height() as f32)
    }

    fn set_single(&mut self, gpu: &Gpu, instance: Instance) {
        self.set_instances(gpu, &[instance]);
    }

    fn set_instances(&mut self, gpu: &Gpu, instances: &[Instance]) {
        let size = (mem::size_of::<Instance>() * instances.len()) as u64;
        if self.instance_buf.size() < size {
            self.instance_buf = gpu.device.create_buffer(&BufferDescriptor {
                label: None,
                size: size.next_power_of_two(),
                usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.instances_bg = single_entry_bg(
                &gpu.device,
                &gpu.instances_bgl,
                self.instance_buf.as_entire_binding(),
            );
        }
        if !instances.is_empty() {
            gpu.queue
                .write_buffer(&self.instance_buf, 0, bytemuck::cast_slice(instances));
        }
        self.instance_count = instances.len() as u32;
    }

    fn draw(&self, p: &mut Pass<'_>) {
        if self.instance_count == 0 {
            return;
        }

        // Every `Drawable` owns its uniform buffer, so each may be drawn once per submission.
        let uniforms = Uniforms {
            render_target_size: p.render_target_size,
        };
        p.gpu
            .queue
            .write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniforms));

        p.pass.set_pipeline(&p.gpu.render_pipeline);
        p.pass.set_bind_group(0, &p.gpu.sampler_bg, &[]);
        p.pass.set_bind_group(1, &self.texture_bg, &[]);
        p.pass.set_bind_group(2, &self.uniforms_bg, &[]);
        p.pass.set_bind_group(3, &self.instances_bg, &[]);
        p.pass.draw(0..4, 0..self.instance_count);
    }
}
