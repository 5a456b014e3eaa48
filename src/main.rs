mod framework;
use firework::fps_estimator::FrameClock;
use firework::{Firework, FireworkParams};
use futures::task::LocalSpawn;
use log::{debug, error, info};
use winit::event::{ElementState, KeyboardInput, MouseScrollDelta, VirtualKeyCode, WindowEvent};

gflags::define! {
    --config: &str = "firework_config.toml"
}
gflags::define! {
    /// Seeds the explosion sampler, for reproducible runs.
    --seed: u64
}
gflags::define! {
    /// Longest frame the simulation steps through at once, in seconds. 0 disables the cap.
    --max_frame_dt: f32 = 0.0
}

// Zoom factor applied per key press or wheel line.
const ZOOM_STEP: f32 = 1.1;
// Wheel pixels that count as one line.
const PIXELS_PER_LINE: f32 = 40.0;
const FPS_LOG_INTERVAL: u64 = 600;

struct FireworkViewer {
    firework: Firework,
    clock: FrameClock,
}

impl FireworkViewer {
    fn get_firework_config() -> FireworkParams {
        match FireworkParams::from_file(CONFIG.flag) {
            Ok(params) => params,
            Err(e) => {
                error!("Failed to load config file({}): {}", CONFIG.flag, e);
                firework::params::get_params_from_default_file()
            }
        }
    }

    fn zoom_by(&mut self, lines: f32) {
        let zoom = self.firework.set_zoom(self.firework.zoom() * ZOOM_STEP.powf(lines));
        debug!("Zoom: {}", zoom);
    }
}

impl framework::Viewer for FireworkViewer {
    fn init(
        config: &wgpu::SurfaceConfiguration,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Self> {
        let params = FireworkViewer::get_firework_config();
        let mut firework = if SEED.is_present() {
            info!("Seeding explosions with {}", SEED.flag);
            Firework::with_seed(params, SEED.flag)?
        } else {
            Firework::new(params)?
        };
        firework.load_resources(device, queue, config.format)?;
        firework.resize(config.width, config.height);

        let max_frame_dt = if MAX_FRAME_DT.flag > 0.0 {
            Some(std::time::Duration::from_secs_f32(MAX_FRAME_DT.flag))
        } else {
            None
        };
        Ok(FireworkViewer {
            firework,
            clock: FrameClock::new(max_frame_dt),
        })
    }

    fn resize(&mut self, config: &wgpu::SurfaceConfiguration) {
        self.firework.resize(config.width, config.height);
    }

    fn update(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        virtual_keycode: Some(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                VirtualKeyCode::R => self.firework.reset(),
                VirtualKeyCode::Space => {
                    if !self.firework.launch() {
                        debug!("Launch ignored, the firework is already in flight");
                    }
                }
                VirtualKeyCode::Plus | VirtualKeyCode::Equals | VirtualKeyCode::NumpadAdd => {
                    self.zoom_by(1.0)
                }
                VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => self.zoom_by(-1.0),
                _ => (),
            },
            WindowEvent::MouseWheel { delta, .. } => match delta {
                MouseScrollDelta::LineDelta(_, lines) => self.zoom_by(lines),
                MouseScrollDelta::PixelDelta(position) => {
                    self.zoom_by(position.y as f32 / PIXELS_PER_LINE)
                }
            },
            _ => (),
        }
    }

    fn render(
        &mut self,
        view: &wgpu::TextureView,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        spawner: &impl LocalSpawn,
    ) {
        let dt = self.clock.tick().as_secs_f32();
        self.firework.update(dt);
        self.firework.render(view, device, queue, spawner);
        if self.clock.frames() % FPS_LOG_INTERVAL == 0 {
            if let Some(fps) = self.clock.fps() {
                info!(
                    "{:.1} fps, {} live particles",
                    fps,
                    self.firework.system().live_count()
                );
            }
        }
    }

    fn shutdown(&mut self) {
        self.firework.shutdown();
    }
}

fn main() -> anyhow::Result<()> {
    framework::run::<FireworkViewer>("Firework")
}
