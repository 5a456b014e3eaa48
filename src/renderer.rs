use crate::buffer_util::{self, SizedBuffer};
use crate::error::Result;
use crate::geometry::{GeometryKernel, ShapeBuffer, ShapeSource};
use crate::integration::BufferSync;
use crate::params::FireworkParams;
use crate::particle_buffer::ParticleBuffer;
use crate::particles::Particle;
use crate::render_style::StyleUniforms;
use crate::shader_utils::{ProgramLoader, StageKind, SHAPE_VERTEX_COUNT};
use crate::simulation::ParticleSystem;
use crate::transform::{TransformBlock, TransformBuffer};
use futures::task::{LocalSpawn, LocalSpawnExt};

fn vertex_entry_point(source: ShapeSource) -> &'static str {
    match source {
        ShapeSource::Kernel => "vs_kernel_shape",
        ShapeSource::Inline => "vs_inline_shape",
    }
}

/// Owns every device resource the firework draws with, and records each frame's
/// buffer sync and render pass.
pub struct FireworkRenderer {
    staging_belt: wgpu::util::StagingBelt,
    particles: ParticleBuffer,
    shape: ShapeBuffer,
    transform: TransformBuffer,
    style: SizedBuffer,
    // Set until the first full upload, the device buffer holds nothing to integrate.
    needs_upload: bool,

    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl FireworkRenderer {
    /// Builds every program and buffer. The geometry kernel is recorded into `encoder`
    /// and runs once, when that encoder is submitted.
    pub fn new(
        device: &wgpu::Device,
        params: &FireworkParams,
        format: wgpu::TextureFormat,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<Self> {
        let loader = ProgramLoader::new(device);
        let shape = ShapeBuffer::new(device, &params.shape);
        GeometryKernel::new(&loader, &shape)?.dispatch(encoder);

        let particles = ParticleBuffer::new(&loader, device, params.capacity)?;
        let transform = TransformBuffer::new(device);
        let style = buffer_util::make_uniform_buffer(
            device,
            "Style uniforms",
            &StyleUniforms::new(params),
        );

        let program = loader.load(
            "Particle render stage",
            crate::include_shader!("particle.wgsl"),
            StageKind::Render,
        )?;
        let module = program.expect_kind(StageKind::Render)?;
        let vertex_entry = vertex_entry_point(params.shape.source);
        let fragment_entry = params.style.falloff.fragment_entry_point();
        log::info!(
            "Render stage uses {} and {} for {:?}",
            vertex_entry,
            fragment_entry,
            format
        );

        let (bind_group, pipeline) = loader.link("Particle render pipeline", |device| {
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Particle render layout"),
                    entries: &[
                        buffer_util::uniform_entry(0, wgpu::ShaderStages::VERTEX),
                        buffer_util::storage_entry(1, wgpu::ShaderStages::VERTEX, true),
                        buffer_util::storage_entry(2, wgpu::ShaderStages::VERTEX, true),
                        buffer_util::uniform_entry(3, wgpu::ShaderStages::VERTEX),
                        buffer_util::uniform_entry(4, wgpu::ShaderStages::FRAGMENT),
                    ],
                });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Particle render bind group"),
                layout: &bind_group_layout,
                entries: &[
                    transform.uniforms.bind(0),
                    particles.records().bind(1),
                    shape.offsets.bind(2),
                    shape.uniforms.bind(3),
                    style.bind(4),
                ],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle render pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Particle render pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: vertex_entry,
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: fragment_entry,
                    targets: &[wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    }],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });
            (bind_group, pipeline)
        })?;

        Ok(FireworkRenderer {
            staging_belt: wgpu::util::StagingBelt::new(1024),
            particles,
            shape,
            transform,
            style,
            needs_upload: true,
            bind_group,
            pipeline,
        })
    }

    /// Records this frame's particle sync followed by the transform refresh. Every write
    /// lands in `encoder` ahead of the render pass `draw` records.
    pub fn prepare(
        &mut self,
        system: &ParticleSystem,
        sync: BufferSync,
        block: &TransformBlock,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let sync = if self.needs_upload {
            BufferSync::Upload
        } else {
            sync
        };
        match sync {
            BufferSync::Unchanged => {}
            BufferSync::Upload => {
                let count =
                    self.particles
                        .upload(&mut self.staging_belt, encoder, device, system.instances());
                log::trace!("Uploaded {} particle records", count);
                self.needs_upload = false;
            }
            BufferSync::Integrate { dt } => {
                let params = system.params();
                log::trace!(
                    "Integrating {} particle records on device, dt = {}",
                    self.particles.count(),
                    dt
                );
                self.particles.integrate(
                    &mut self.staging_belt,
                    encoder,
                    device,
                    dt,
                    params.gravity,
                    params.decay_rate,
                );
            }
        }
        self.transform
            .refresh(&mut self.staging_belt, encoder, device, block);
    }

    /// Clears `target` to `background` and draws one triangle per resident record.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        background: [f32; 4],
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle render pass"),
            color_attachments: &[wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: background[0] as f64,
                        g: background[1] as f64,
                        b: background[2] as f64,
                        a: background[3] as f64,
                    }),
                    store: true,
                },
            }],
            depth_stencil_attachment: None,
        });
        let instances = self.particles.count();
        if instances == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.draw(0..SHAPE_VERTEX_COUNT, 0..instances);
    }

    /// Closes the frame's staging writes, submits `encoder` and hands the belt's
    /// recall to `spawner`.
    pub fn submit(
        &mut self,
        queue: &wgpu::Queue,
        encoder: wgpu::CommandEncoder,
        spawner: &impl LocalSpawn,
    ) {
        self.staging_belt.finish();
        queue.submit(Some(encoder.finish()));
        if let Err(e) = spawner.spawn_local(self.staging_belt.recall()) {
            log::error!("Failed to recall staging belt: {:?}", e);
        }
    }

    /// Blocks until the resident records are readable on the host.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<Particle>> {
        self.particles.read_back(device, queue, self.particles.count())
    }

    pub fn destroy(&self) {
        self.particles.destroy();
        self.shape.destroy();
        self.transform.destroy();
        self.style.destroy();
    }
}
