use crate::buffer_util::{self, SizedBuffer};
use crate::error::Result;
use crate::particles::Particle;
use crate::shader_utils::{self, ProgramLoader, StageKind};

// Must match IntegrateParams in integrate.wgsl.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct IntegrateUniforms {
    pub dt: f32,
    pub gravity: f32,
    pub decay_rate: f32,
    pub count: u32,
}

/// Fixed-capacity device storage for particle records. Allocated once, the resident
/// prefix is rewritten in place and never reallocated.
pub struct ParticleBuffer {
    records: SizedBuffer,
    capacity: u32,
    count: u32,

    integrate_uniforms: SizedBuffer,
    integrate_bind_group: wgpu::BindGroup,
    integrate_pipeline: wgpu::ComputePipeline,
}

impl ParticleBuffer {
    pub fn new(loader: &ProgramLoader, device: &wgpu::Device, capacity: u32) -> Result<Self> {
        let records = SizedBuffer::allocate(
            device,
            "Particle records",
            Particle::SIZE * capacity as wgpu::BufferAddress,
            wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        );
        let integrate_uniforms = buffer_util::make_default_uniform_buffer::<IntegrateUniforms>(
            device,
            "Integrate uniforms",
        );
        let program = loader.load(
            "Integrate kernel",
            crate::include_shader!("integrate.wgsl"),
            StageKind::Compute,
        )?;
        let module = program.expect_kind(StageKind::Compute)?;
        let (integrate_bind_group, integrate_pipeline) =
            loader.link("Integrate kernel pipeline", |device| {
                let bind_group_layout =
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("Integrate kernel layout"),
                        entries: &[
                            buffer_util::uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                            buffer_util::storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
                        ],
                    });
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Integrate kernel pipeline layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    });
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("Integrate kernel pipeline"),
                    layout: Some(&pipeline_layout),
                    module,
                    entry_point: "main",
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Integrate kernel bind group"),
                    layout: &bind_group_layout,
                    entries: &[integrate_uniforms.bind(0), records.bind(1)],
                });
                (bind_group, pipeline)
            })?;
        Ok(ParticleBuffer {
            records,
            capacity,
            count: 0,
            integrate_uniforms,
            integrate_bind_group,
            integrate_pipeline,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of records currently resident, starting at offset 0.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn records(&self) -> &SizedBuffer {
        &self.records
    }

    /// Records a write of `particles` into the buffer's prefix. Anything past capacity
    /// is dropped. Returns the resident count.
    pub fn upload(
        &mut self,
        belt: &mut wgpu::util::StagingBelt,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        particles: &[Particle],
    ) -> u32 {
        let n = std::cmp::min(particles.len(), self.capacity as usize);
        if n < particles.len() {
            log::warn!(
                "Dropping {} particle records past capacity {}",
                particles.len() - n,
                self.capacity
            );
        }
        self.records.upload_subrange(
            belt,
            encoder,
            device,
            0,
            bytemuck::cast_slice(&particles[..n]),
        );
        self.count = n as u32;
        self.count
    }

    /// Records one Euler step plus life decay over the resident records.
    pub fn integrate(
        &self,
        belt: &mut wgpu::util::StagingBelt,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        dt: f32,
        gravity: f32,
        decay_rate: f32,
    ) {
        if self.count == 0 {
            return;
        }
        let uniforms = IntegrateUniforms {
            dt,
            gravity,
            decay_rate,
            count: self.count,
        };
        self.integrate_uniforms
            .upload_subrange(belt, encoder, device, 0, bytemuck::bytes_of(&uniforms));
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Integrate particles"),
        });
        cpass.set_pipeline(&self.integrate_pipeline);
        cpass.set_bind_group(0, &self.integrate_bind_group, &[]);
        cpass.dispatch(shader_utils::work_groups_for(self.count), 1, 1);
    }

    /// Blocks until the first `count` records are readable on the host. Only for
    /// tests and debugging.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        count: u32,
    ) -> Result<Vec<Particle>> {
        let count = std::cmp::min(count, self.capacity);
        buffer_util::read_back(
            device,
            queue,
            &self.records,
            Particle::SIZE * count as wgpu::BufferAddress,
        )
    }

    pub fn destroy(&self) {
        self.records.destroy();
        self.integrate_uniforms.destroy();
    }
}
