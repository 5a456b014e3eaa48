use crate::buffer_util::{self, SizedBuffer};
use crate::error::Result;
use crate::params::ShapeParams;
use crate::shader_utils::{ProgramLoader, StageKind, SHAPE_VERTEX_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeStyle {
    // Inscribed in a circle of radius `size`, pointing up.
    Equilateral = 0,
    // Right angle in the lower left corner, legs of length 2 * `size`.
    RightAngle = 1,
}

/// Where the render stage gets the local triangle from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeSource {
    // Written once by the geometry kernel into the shape buffer.
    Kernel,
    // Recomputed by the vertex stage for every vertex.
    Inline,
}

const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;
const THIRD_TURN: f32 = 2.0 * std::f32::consts::PI / 3.0;

/// Host copy of `shape_offset` in shape.inc. Returns None past the last vertex.
pub fn shape_offset(style: ShapeStyle, size: f32, id: u32) -> Option<[f32; 2]> {
    if id >= SHAPE_VERTEX_COUNT {
        return None;
    }
    let offset = match style {
        ShapeStyle::RightAngle => match id {
            0 => [-size, -size],
            1 => [size, -size],
            _ => [-size, size],
        },
        ShapeStyle::Equilateral => {
            let angle = HALF_PI + id as f32 * THIRD_TURN;
            [angle.cos() * size, angle.sin() * size]
        }
    };
    Some(offset)
}

pub fn shape_offsets(style: ShapeStyle, size: f32) -> [[f32; 2]; 3] {
    let mut out = [[0.0; 2]; 3];
    for (id, slot) in out.iter_mut().enumerate() {
        if let Some(offset) = shape_offset(style, size, id as u32) {
            *slot = offset;
        }
    }
    out
}

// Center of the largest circle inside the triangle, the glow is centered there.
pub fn shape_center(style: ShapeStyle, size: f32) -> [f32; 2] {
    match style {
        ShapeStyle::Equilateral => [0.0, 0.0],
        ShapeStyle::RightAngle => {
            let r = shape_inradius(style, size);
            [-size + r, -size + r]
        }
    }
}

pub fn shape_inradius(style: ShapeStyle, size: f32) -> f32 {
    match style {
        ShapeStyle::Equilateral => 0.5 * size,
        ShapeStyle::RightAngle => (2.0 - std::f32::consts::SQRT_2) * size,
    }
}

// Must match ShapeParams in shape.inc.
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ShapeUniforms {
    pub size: f32,
    pub style: u32,
    _padding: [u32; 2],
}

impl ShapeUniforms {
    pub fn new(params: &ShapeParams) -> Self {
        ShapeUniforms {
            size: params.size,
            style: params.style as u32,
            _padding: [0; 2],
        }
    }
}

/// The shared local-space triangle plus the parameters it was generated from.
pub struct ShapeBuffer {
    pub offsets: SizedBuffer,
    pub uniforms: SizedBuffer,
}

impl ShapeBuffer {
    pub fn new(device: &wgpu::Device, params: &ShapeParams) -> Self {
        let size = (std::mem::size_of::<[f32; 2]>() as u32 * SHAPE_VERTEX_COUNT)
            as wgpu::BufferAddress;
        ShapeBuffer {
            offsets: SizedBuffer::allocate(
                device,
                "Shape offsets",
                size,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            ),
            uniforms: buffer_util::make_uniform_buffer(
                device,
                "Shape uniforms",
                &ShapeUniforms::new(params),
            ),
        }
    }

    pub fn destroy(&self) {
        self.offsets.destroy();
        self.uniforms.destroy();
    }
}

/// Compute program that writes the local triangle into a `ShapeBuffer`.
pub struct GeometryKernel {
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::ComputePipeline,
}

impl GeometryKernel {
    pub fn new(loader: &ProgramLoader, shape: &ShapeBuffer) -> Result<Self> {
        let program = loader.load(
            "Geometry kernel",
            crate::include_shader!("geometry.wgsl"),
            StageKind::Compute,
        )?;
        let module = program.expect_kind(StageKind::Compute)?;
        loader.link("Geometry kernel pipeline", |device| {
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Geometry kernel layout"),
                    entries: &[
                        buffer_util::uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                        buffer_util::storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
                    ],
                });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Geometry kernel pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Geometry kernel pipeline"),
                layout: Some(&pipeline_layout),
                module,
                entry_point: "main",
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Geometry kernel bind group"),
                layout: &bind_group_layout,
                entries: &[shape.uniforms.bind(0), shape.offsets.bind(1)],
            });
            GeometryKernel {
                bind_group,
                pipeline,
            }
        })
    }

    // A single work group covers every vertex; the extra invocations exit early.
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Geometry kernel"),
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);
        cpass.dispatch(1, 1, 1);
    }
}
