//! Device-side checks. Each test is skipped with a message when no adapter is available.

use firework::buffer_util;
use firework::error::FireworkError;
use firework::geometry::{self, GeometryKernel, ShapeBuffer, ShapeStyle};
use firework::integration::{BufferSync, IntegrationBackend};
use firework::params::{FireworkParams, ShapeParams};
use firework::particle_buffer::ParticleBuffer;
use firework::particles::Particle;
use firework::shader_utils::{ProgramLoader, StageKind};
use firework::simulation::Phase;
use firework::Firework;
use futures::executor::block_on;

fn init_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
    let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;
    block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Test device"),
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
        },
        None,
    ))
    .ok()
}

fn records(k: usize) -> Vec<Particle> {
    (0..k)
        .map(|i| {
            let t = i as f32;
            Particle {
                position: [t * 0.5, -t],
                velocity: [1.0 - t * 0.01, 0.25 * t],
                life: 0.5 + t * 0.1,
                size: 0.01 + t * 0.001,
            }
        })
        .collect()
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &mut ParticleBuffer,
    particles: &[Particle],
) -> u32 {
    let mut belt = wgpu::util::StagingBelt::new(1024);
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let count = buffer.upload(&mut belt, &mut encoder, device, particles);
    belt.finish();
    queue.submit(Some(encoder.finish()));
    count
}

#[test]
fn upload_then_read_back_preserves_order() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let loader = ProgramLoader::new(&device);
    let mut buffer = ParticleBuffer::new(&loader, &device, 64).unwrap();
    let expected = records(37);
    assert_eq!(upload(&device, &queue, &mut buffer, &expected), 37);
    assert_eq!(buffer.read_back(&device, &queue, 37).unwrap(), expected);

    // A shorter upload only rewrites the prefix.
    let shorter = records(5);
    assert_eq!(upload(&device, &queue, &mut buffer, &shorter), 5);
    assert_eq!(buffer.count(), 5);
    assert_eq!(buffer.read_back(&device, &queue, 5).unwrap(), shorter);

    // Empty uploads are legal and leave nothing resident.
    assert_eq!(upload(&device, &queue, &mut buffer, &[]), 0);
    assert!(buffer.read_back(&device, &queue, 0).unwrap().is_empty());
}

#[test]
fn uploads_past_capacity_are_truncated() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let loader = ProgramLoader::new(&device);
    let mut buffer = ParticleBuffer::new(&loader, &device, 16).unwrap();
    let all = records(40);
    assert_eq!(upload(&device, &queue, &mut buffer, &all), 16);
    assert_eq!(buffer.read_back(&device, &queue, 40).unwrap(), &all[..16]);
}

#[test]
fn device_integration_matches_host_euler() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let loader = ProgramLoader::new(&device);
    // More records than one work group, so the tail group's bounds check is exercised.
    let mut host = records(100);
    let mut buffer = ParticleBuffer::new(&loader, &device, 128).unwrap();
    upload(&device, &queue, &mut buffer, &host);

    let (dt, gravity, decay_rate) = (1.0 / 60.0, -2.0, 1.0);
    for _ in 0..3 {
        let mut belt = wgpu::util::StagingBelt::new(1024);
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        buffer.integrate(&mut belt, &mut encoder, &device, dt, gravity, decay_rate);
        belt.finish();
        queue.submit(Some(encoder.finish()));
        for p in host.iter_mut() {
            p.integrate(dt, gravity);
            p.decay(decay_rate, dt);
        }
    }

    let device_records = buffer.read_back(&device, &queue, 100).unwrap();
    for (d, h) in device_records.iter().zip(host.iter()) {
        for i in 0..2 {
            assert!((d.position[i] - h.position[i]).abs() < 1e-4, "{:?} {:?}", d, h);
            assert!((d.velocity[i] - h.velocity[i]).abs() < 1e-4, "{:?} {:?}", d, h);
        }
        assert!((d.life - h.life).abs() < 1e-5);
        assert_eq!(d.size, h.size);
    }
}

#[test]
fn geometry_kernel_writes_the_host_shape() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let loader = ProgramLoader::new(&device);
    for style in [ShapeStyle::Equilateral, ShapeStyle::RightAngle].iter() {
        let params = ShapeParams {
            style: *style,
            size: 0.75,
            ..ShapeParams::default()
        };
        let shape = ShapeBuffer::new(&device, &params);
        let kernel = GeometryKernel::new(&loader, &shape).unwrap();
        let expected = geometry::shape_offsets(*style, params.size);

        // Running the kernel twice gives the same triangle.
        for _ in 0..2 {
            let mut encoder =
                device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            kernel.dispatch(&mut encoder);
            queue.submit(Some(encoder.finish()));
            let offsets: Vec<[f32; 2]> =
                buffer_util::read_back(&device, &queue, &shape.offsets, shape.offsets.size)
                    .unwrap();
            assert_eq!(offsets.len(), 3);
            for (got, want) in offsets.iter().zip(expected.iter()) {
                assert!((got[0] - want[0]).abs() < 1e-5, "{:?}: {:?}", style, offsets);
                assert!((got[1] - want[1]).abs() < 1e-5, "{:?}: {:?}", style, offsets);
            }
        }
    }
}

#[test]
fn broken_source_is_a_compilation_error() {
    let (device, _queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let loader = ProgramLoader::new(&device);
    match loader.load("Broken kernel", "fn main( {", StageKind::Compute) {
        Err(FireworkError::ResourceCompilation { label, .. }) => assert_eq!(label, "Broken kernel"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("broken source compiled"),
    }
}

#[test]
fn frames_render_without_validation_errors() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let target = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        })
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut pool = futures::executor::LocalPool::new();
    let spawner = pool.spawner();

    for backend in [IntegrationBackend::Host, IntegrationBackend::Device].iter() {
        let params = FireworkParams {
            capacity: 128,
            burst_count: 100,
            integration: *backend,
            ..FireworkParams::default()
        };
        let mut firework = Firework::with_seed(params, 1).unwrap();
        firework.load_resources(&device, &queue, format).unwrap();
        firework.resize(64, 64);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        // Through the explosion and into the decay.
        for _ in 0..120 {
            firework.update(1.0 / 60.0);
            firework.render(&target, &device, &queue, &spawner);
            device.poll(wgpu::Maintain::Poll);
            pool.run_until_stalled();
        }
        let error = block_on(device.pop_error_scope());
        assert!(error.is_none(), "{:?}: {:?}", backend, error);
        firework.shutdown();
        assert!(!firework.is_loaded());
    }
}

#[test]
fn device_backend_tracks_the_host_across_frames() {
    let (device, queue) = match init_device() {
        Some(dq) => dq,
        None => {
            println!("Skipped: No GPU");
            return;
        }
    };
    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let target = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen target"),
            size: wgpu::Extent3d {
                width: 32,
                height: 32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        })
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut pool = futures::executor::LocalPool::new();
    let spawner = pool.spawner();

    let params = FireworkParams {
        capacity: 128,
        burst_count: 100,
        integration: IntegrationBackend::Device,
        ..FireworkParams::default()
    };
    let mut firework = Firework::with_seed(params, 42).unwrap();
    assert!(firework
        .read_back_particles(&device, &queue)
        .unwrap()
        .is_empty());
    firework.load_resources(&device, &queue, format).unwrap();

    let dt = 1.0 / 60.0;
    let mut integrated_frames = 0;
    let mut merged_frames = 0;
    let mut decaying_frames = 0;
    for frame in 0..200 {
        // Some frames carry two updates, so their syncs are merged before the render.
        let updates = if frame % 7 == 3 { 2 } else { 1 };
        let mut sync = BufferSync::Unchanged;
        for _ in 0..updates {
            let change = firework.update(dt);
            let phase = firework.system().phase();
            sync = sync.merge(params.integration.sync_for(&change, phase));
        }
        if let BufferSync::Integrate { .. } = sync {
            integrated_frames += 1;
        }
        if updates == 2 && firework.system().phase() == Phase::Decaying {
            merged_frames += 1;
        }
        if firework.system().phase() == Phase::Decaying {
            decaying_frames += 1;
        }
        firework.render(&target, &device, &queue, &spawner);
        device.poll(wgpu::Maintain::Wait);
        pool.run_until_stalled();

        let resident = firework.read_back_particles(&device, &queue).unwrap();
        let host = firework.system().instances();
        assert_eq!(resident.len(), host.len(), "frame {}", frame);
        for (d, h) in resident.iter().zip(host.iter()) {
            for i in 0..2 {
                assert!(
                    (d.position[i] - h.position[i]).abs() < 1e-4,
                    "frame {}: {:?} {:?}",
                    frame,
                    d,
                    h
                );
                assert!(
                    (d.velocity[i] - h.velocity[i]).abs() < 1e-4,
                    "frame {}: {:?} {:?}",
                    frame,
                    d,
                    h
                );
            }
            assert!((d.life - h.life).abs() < 1e-4, "frame {}: {:?} {:?}", frame, d, h);
            assert_eq!(d.size, h.size, "frame {}", frame);
        }
    }
    assert!(decaying_frames > 0);
    assert!(integrated_frames > 0);
    assert!(merged_frames > 0);
    firework.shutdown();
}
