use crate::error::Result;
use wgpu::util::DeviceExt;

/// A device buffer together with the byte size it was allocated with.
pub struct SizedBuffer {
    pub buffer: wgpu::Buffer,
    pub size: wgpu::BufferAddress,
}

impl SizedBuffer {
    pub fn allocate(
        device: &wgpu::Device,
        label: &str,
        size: wgpu::BufferAddress,
        usage: wgpu::BufferUsages,
    ) -> Self {
        log::info!("Allocating {} ({} bytes)", label, size);
        SizedBuffer {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            }),
            size,
        }
    }

    /// Records a write of `bytes` at `offset` into the encoder's command stream, so it
    /// lands before any pass recorded after it. Empty writes are skipped.
    pub fn upload_subrange(
        &self,
        belt: &mut wgpu::util::StagingBelt,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        offset: wgpu::BufferAddress,
        bytes: &[u8],
    ) {
        debug_assert!(offset + bytes.len() as wgpu::BufferAddress <= self.size);
        if let Some(size) = wgpu::BufferSize::new(bytes.len() as wgpu::BufferAddress) {
            belt.write_buffer(encoder, &self.buffer, offset, size, device)
                .copy_from_slice(bytes);
        }
    }

    pub fn bind(&self, binding: u32) -> wgpu::BindGroupEntry {
        wgpu::BindGroupEntry {
            binding,
            resource: self.buffer.as_entire_binding(),
        }
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}

pub fn make_default_uniform_buffer<T: std::default::Default + bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
) -> SizedBuffer {
    let uniforms = T::default();
    make_uniform_buffer::<T>(device, label, &uniforms)
}

pub fn make_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &T,
) -> SizedBuffer {
    let bytes = bytemuck::bytes_of(data);
    SizedBuffer {
        buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }),
        size: bytes.len() as _,
    }
}

pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Copies the first `bytes` of `source` into a mappable buffer and blocks until the
/// device has written it. Used for read-back checks, not per frame.
pub fn read_back<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &SizedBuffer,
    bytes: wgpu::BufferAddress,
) -> Result<Vec<T>> {
    if bytes == 0 {
        return Ok(Vec::new());
    }
    debug_assert!(bytes <= source.size);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Read back staging"),
        size: bytes,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Read back encoder"),
    });
    encoder.copy_buffer_to_buffer(&source.buffer, 0, &staging, 0, bytes);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let mapped = slice.map_async(wgpu::MapMode::Read);
    device.poll(wgpu::Maintain::Wait);
    futures::executor::block_on(mapped)?;
    let out = {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&data).to_vec()
    };
    staging.unmap();
    staging.destroy();
    Ok(out)
}
