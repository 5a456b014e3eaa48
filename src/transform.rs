use crate::buffer_util::{self, SizedBuffer};
use crate::params::ViewParams;
use cgmath::{Matrix4, Vector3, Vector4};

#[cfg_attr(rustfmt, rustfmt_skip)]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Must match Transform in particle.wgsl: three column major 4x4 matrices, 64 bytes each.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformBlock {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
}

impl Default for TransformBlock {
    fn default() -> Self {
        let identity = cgmath::conv::array4x4(Matrix4::<f32>::from_scale(1.0));
        TransformBlock {
            projection: identity,
            view: identity,
            world: identity,
        }
    }
}

impl TransformBlock {
    /// Where the vertex stage puts a world-space point.
    pub fn clip_position(&self, point: [f32; 2]) -> [f32; 4] {
        let projection = Matrix4::from(self.projection);
        let view = Matrix4::from(self.view);
        let world = Matrix4::from(self.world);
        let clip = projection * view * world * Vector4::new(point[0], point[1], 0.0, 1.0);
        [clip.x, clip.y, clip.z, clip.w]
    }
}

/// Host state behind the transform block: the viewport and the 2D camera.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
    width: u32,
    height: u32,
    zoom: f32,
    min_zoom: f32,
    extent: f32,
    center: [f32; 2],
    world_scale: f32,
    world_offset: [f32; 2],
}

impl ViewState {
    pub fn new(params: &ViewParams, width: u32, height: u32) -> Self {
        let mut state = ViewState {
            width: std::cmp::max(width, 1),
            height: std::cmp::max(height, 1),
            zoom: params.min_zoom,
            min_zoom: params.min_zoom,
            extent: params.extent,
            center: params.camera_center,
            world_scale: params.world_scale,
            world_offset: params.world_offset,
        };
        state.set_zoom(params.initial_zoom);
        state
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        // Minimized windows report a zero size, keep the last usable aspect.
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sets the zoom factor, never below the configured minimum. Returns the zoom in
    /// effect.
    pub fn set_zoom(&mut self, factor: f32) -> f32 {
        // Written so NaN also lands on the minimum.
        self.zoom = if factor >= self.min_zoom {
            factor
        } else {
            self.min_zoom
        };
        self.zoom
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn to_block(&self) -> TransformBlock {
        let aspect = self.width as f32 / self.height as f32;
        let half_height = self.extent / self.zoom;
        let half_width = half_height * aspect;
        let mx_projection = cgmath::ortho(
            -half_width,
            half_width,
            -half_height,
            half_height,
            -1.0,
            1.0,
        );
        let mx_view =
            Matrix4::from_translation(Vector3::new(-self.center[0], -self.center[1], 0.0));
        let mx_world = Matrix4::from_translation(Vector3::new(
            self.world_offset[0],
            self.world_offset[1],
            0.0,
        )) * Matrix4::from_scale(self.world_scale);
        TransformBlock {
            projection: cgmath::conv::array4x4(OPENGL_TO_WGPU_MATRIX * mx_projection),
            view: cgmath::conv::array4x4(mx_view),
            world: cgmath::conv::array4x4(mx_world),
        }
    }
}

/// The uniform buffer holding the `TransformBlock`, rewritten once per frame.
pub struct TransformBuffer {
    pub uniforms: SizedBuffer,
}

impl TransformBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        TransformBuffer {
            uniforms: buffer_util::make_default_uniform_buffer::<TransformBlock>(
                device,
                "Transform uniforms",
            ),
        }
    }

    pub fn refresh(
        &self,
        belt: &mut wgpu::util::StagingBelt,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        block: &TransformBlock,
    ) {
        self.uniforms
            .upload_subrange(belt, encoder, device, 0, bytemuck::bytes_of(block));
    }

    pub fn destroy(&self) {
        self.uniforms.destroy();
    }
}
