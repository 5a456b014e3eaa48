use crate::error::Result;
use crate::integration::{BufferSync, FrameChange};
use crate::params::FireworkParams;
use crate::particles::Particle;
use crate::renderer::FireworkRenderer;
use crate::simulation::ParticleSystem;
use crate::transform::ViewState;
use futures::task::LocalSpawn;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The firework as a frame driver sees it: simulation, view and the device resources,
/// advanced by `update` and drawn by `render`.
pub struct Firework {
    system: ParticleSystem,
    rng: StdRng,
    view: ViewState,
    // Buffer work owed to the device since the last render.
    pending: BufferSync,
    renderer: Option<FireworkRenderer>,
}

impl Firework {
    pub fn new(params: FireworkParams) -> Result<Self> {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Deterministic explosions for a given seed.
    pub fn with_seed(params: FireworkParams, seed: u64) -> Result<Self> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(params: FireworkParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        log::info!(
            "Firework with capacity {}, bursts of {}, {:?} integration",
            params.capacity,
            params.burst_size(),
            params.integration
        );
        Ok(Firework {
            view: ViewState::new(&params.view, 1, 1),
            system: ParticleSystem::new(params),
            rng,
            pending: BufferSync::Upload,
            renderer: None,
        })
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn is_loaded(&self) -> bool {
        self.renderer.is_some()
    }

    /// Builds every program and buffer and runs the geometry kernel. Fails with
    /// `ResourceCompilation` if any stage doesn't compile or link.
    pub fn load_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Result<()> {
        if self.renderer.is_some() {
            self.release_resources();
        }
        let mut init_encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Firework init"),
        });
        let renderer =
            FireworkRenderer::new(device, self.system.params(), format, &mut init_encoder)?;
        queue.submit(Some(init_encoder.finish()));
        self.renderer = Some(renderer);
        self.pending = BufferSync::Upload;
        log::info!("Firework resources loaded");
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> FrameChange {
        let change = self.system.update(dt, &mut self.rng);
        let backend = self.system.params().integration;
        self.pending = self
            .pending
            .merge(backend.sync_for(&change, self.system.phase()));
        change
    }

    /// Records and submits one frame into `target`. Before `load_resources` this is a
    /// no-op.
    pub fn render(
        &mut self,
        target: &wgpu::TextureView,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        spawner: &impl LocalSpawn,
    ) {
        let renderer = match self.renderer.as_mut() {
            Some(renderer) => renderer,
            None => {
                log::warn!("Render requested before resources were loaded");
                return;
            }
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Firework frame"),
        });
        let sync = std::mem::replace(&mut self.pending, BufferSync::Unchanged);
        renderer.prepare(&self.system, sync, &self.view.to_block(), device, &mut encoder);
        renderer.draw(
            &mut encoder,
            target,
            self.system.params().style.background,
        );
        renderer.submit(queue, encoder, spawner);
    }

    /// The records currently resident on the device, as the last rendered frame drew
    /// them. Empty before `load_resources`. Blocks on the device, so keep it to tests
    /// and debugging.
    pub fn read_back_particles(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<Particle>> {
        match self.renderer.as_ref() {
            Some(renderer) => renderer.read_back(device, queue),
            None => Ok(Vec::new()),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        log::info!("Resizing to ({}, {})", width, height);
        self.view.resize(width, height);
    }

    pub fn set_zoom(&mut self, factor: f32) -> f32 {
        self.view.set_zoom(factor)
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom()
    }

    pub fn launch(&mut self) -> bool {
        let launched = self.system.launch();
        if launched {
            self.pending = BufferSync::Upload;
        }
        launched
    }

    pub fn reset(&mut self) {
        self.system.reset();
        self.pending = BufferSync::Upload;
    }

    /// Destroys the device resources. The simulation keeps running and a later
    /// `load_resources` re-uploads it.
    pub fn release_resources(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            renderer.destroy();
            log::info!("Firework resources released");
        }
    }

    pub fn shutdown(&mut self) {
        log::info!(
            "Shutting down after {:.2}s and {} bursts",
            self.system.clock(),
            self.system.bursts()
        );
        self.release_resources();
    }
}

impl Drop for Firework {
    fn drop(&mut self) {
        self.release_resources();
    }
}
