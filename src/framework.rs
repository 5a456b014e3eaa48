use futures::task::LocalSpawn;
use winit::event::WindowEvent;

gflags::define! {
    --log_filter: &str = "warn,firework=info"
}
gflags::define! {
    -h, --help = false
}

// "Framework" for a windowed executable.
pub trait Viewer: 'static + Sized {
    fn init(
        config: &wgpu::SurfaceConfiguration,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Self>;
    fn resize(&mut self, config: &wgpu::SurfaceConfiguration);
    fn update(&mut self, event: WindowEvent);
    fn render(
        &mut self,
        view: &wgpu::TextureView,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        spawner: &impl LocalSpawn,
    );
    fn shutdown(&mut self);
}

fn is_exit_request(event: &WindowEvent) -> bool {
    use winit::event::{ElementState, KeyboardInput, VirtualKeyCode};
    match event {
        WindowEvent::CloseRequested => true,
        WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    virtual_keycode: Some(VirtualKeyCode::Q),
                    state: ElementState::Pressed,
                    ..
                },
            ..
        }
        | WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    virtual_keycode: Some(VirtualKeyCode::Escape),
                    state: ElementState::Pressed,
                    ..
                },
            ..
        } => true,
        _ => false,
    }
}

async fn run_async<V: Viewer>(title: &str) -> anyhow::Result<()> {
    use winit::{
        event,
        event_loop::{ControlFlow, EventLoop},
    };

    let event_loop = EventLoop::new();
    log::info!("Initializing the window...");

    let window = winit::window::WindowBuilder::new()
        .with_title(title)
        .with_inner_size(winit::dpi::Size::from(winit::dpi::LogicalSize::new(
            640 * 2,
            360 * 2,
        )))
        .build(&event_loop)?;
    let size = window.inner_size();

    let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
    let surface = unsafe { instance.create_surface(&window) };
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .ok_or(firework::FireworkError::NoAdapter)?;
    log::info!("Using adapter {:?}", adapter.get_info());

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .map_err(firework::FireworkError::from)?;

    let format = surface
        .get_preferred_format(&adapter)
        .ok_or(firework::FireworkError::Surface)?;
    let mut config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode: wgpu::PresentMode::Fifo,
    };
    surface.configure(&device, &config);

    log::info!("Initializing the viewer...");
    let mut viewer = V::init(&config, &device, &queue)?;

    let mut local_pool = futures::executor::LocalPool::new();
    let local_spawner = local_pool.spawner();
    let mut last_frame_start = std::time::Instant::now();

    log::info!("Entering render loop...");
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            event::Event::MainEventsCleared => {
                local_pool.run_until_stalled();
                window.request_redraw();
            }
            event::Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            }
            | event::Event::WindowEvent {
                event: WindowEvent::ScaleFactorChanged {
                    new_inner_size: &mut size,
                    ..
                },
                ..
            } => {
                log::info!("Resizing to {:?}", size);
                // A minimized window reports zero, which the surface can't be configured with.
                if size.width > 0 && size.height > 0 {
                    config.width = size.width;
                    config.height = size.height;
                    surface.configure(&device, &config);
                    viewer.resize(&config);
                }
            }
            event::Event::WindowEvent { event, .. } => {
                if is_exit_request(&event) {
                    *control_flow = ControlFlow::Exit;
                } else {
                    viewer.update(event);
                }
            }
            event::Event::RedrawRequested(_) => {
                let frame = match surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("Dropped frame: {}, reconfiguring the surface", e);
                        surface.configure(&device, &config);
                        return;
                    }
                };
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let cpu_time_start = std::time::Instant::now();
                viewer.render(&view, &device, &queue, &local_spawner);
                let cpu_time = cpu_time_start.elapsed();
                frame.present();
                let frame_time = last_frame_start.elapsed();
                last_frame_start = std::time::Instant::now();
                log::trace!("Frame time: {:?}, CPU time: {:?}", frame_time, cpu_time);
            }
            event::Event::LoopDestroyed => {
                viewer.shutdown();
            }
            _ => (),
        }
    });
}

pub fn run<V: Viewer>(title: &str) -> anyhow::Result<()> {
    gflags::parse();
    if HELP.flag {
        gflags::print_help_and_exit(0);
    }
    scrub_log::init_with_filter_string(LOG_FILTER.flag)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {:?}", e))?;
    futures::executor::block_on(run_async::<V>(title))
}
