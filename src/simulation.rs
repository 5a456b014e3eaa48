use crate::integration::FrameChange;
use crate::params::FireworkParams;
use crate::particles::Particle;
use log::{debug, trace};
use rand::Rng;

// The projectile explodes once its vertical velocity is within this fraction of one
// gravity step of zero. Summing f32 gravity steps leaves a residue of a few ulps where
// the exact apex would hit 0.
pub const APEX_TOLERANCE: f32 = 1e-3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    // Projectile parked on the pad, waiting for `launch`.
    PreLaunch,
    Ascending,
    // Burst particles in flight. The explosion itself happens inside `update`.
    Decaying,
}

/// The firework's whole simulation state. It is the source of truth for the device
/// particle buffer, which mirrors `instances()`.
pub struct ParticleSystem {
    params: FireworkParams,
    phase: Phase,
    projectile: Particle,
    particles: Vec<Particle>,

    // Seconds of simulated time, summed from the frame deltas.
    clock: f64,
    bursts: u64,
    restarted: bool,
}

fn launch_record(params: &FireworkParams) -> Particle {
    Particle {
        position: params.launch_position,
        velocity: params.launch_velocity,
        life: params.life.max,
        size: params.projectile_size,
    }
}

/// Draws one burst particle at `origin` with a uniform direction and banded speed,
/// life and size.
pub fn sample_particle<R: Rng>(params: &FireworkParams, origin: [f32; 2], rng: &mut R) -> Particle {
    let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let speed = params.speed.sample(rng);
    Particle {
        position: origin,
        velocity: [angle.cos() * speed, angle.sin() * speed],
        life: params.life.sample(rng),
        size: params.size.sample(rng),
    }
}

impl ParticleSystem {
    pub fn new(params: FireworkParams) -> Self {
        ParticleSystem {
            projectile: launch_record(&params),
            particles: Vec::with_capacity(params.capacity as usize),
            params,
            phase: Phase::Ascending,
            clock: 0.0,
            bursts: 0,
            restarted: false,
        }
    }

    pub fn params(&self) -> &FireworkParams {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn projectile(&self) -> &Particle {
        &self.projectile
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    /// Records the render stage draws, one instance each.
    pub fn instances(&self) -> &[Particle] {
        match self.phase {
            Phase::Decaying => &self.particles,
            Phase::PreLaunch | Phase::Ascending => std::slice::from_ref(&self.projectile),
        }
    }

    /// Advances the state machine by `dt` seconds. `dt` is used as given.
    pub fn update<R: Rng>(&mut self, dt: f32, rng: &mut R) -> FrameChange {
        let mut change = FrameChange {
            dt,
            restarted: std::mem::replace(&mut self.restarted, false),
            ..FrameChange::default()
        };
        self.clock += dt as f64;
        match self.phase {
            Phase::PreLaunch => {}
            Phase::Ascending => {
                self.projectile.integrate(dt, self.params.gravity);
                change.moved = true;
                let step = (self.params.gravity * dt).abs();
                if self.projectile.velocity[1] <= APEX_TOLERANCE * step {
                    self.explode(rng);
                    change.exploded = true;
                    // An empty burst has nothing to decay.
                    if self.particles.is_empty() {
                        self.finish_burst();
                        change.relaunched = true;
                    }
                }
            }
            Phase::Decaying => {
                change.moved = true;
                change.removed = self.decay(dt);
                if self.particles.is_empty() {
                    self.finish_burst();
                    change.relaunched = true;
                }
            }
        }
        change
    }

    fn explode<R: Rng>(&mut self, rng: &mut R) {
        let apex = self.projectile.position;
        let count = self.params.burst_size();
        if count < self.params.burst_count as usize {
            debug!(
                "Burst of {} truncated to capacity {}",
                self.params.burst_count, count
            );
        }
        let params = &self.params;
        self.particles.clear();
        self.particles
            .extend((0..count).map(|_| sample_particle(params, apex, rng)));
        self.bursts += 1;
        self.phase = Phase::Decaying;
        debug!(
            "Exploded at ({}, {}) into {} particles, t = {:.3}",
            apex[0], apex[1], count, self.clock
        );
    }

    // Integrates and ages every particle, then drops the dead ones. Returns how many
    // were removed.
    fn decay(&mut self, dt: f32) -> usize {
        let gravity = self.params.gravity;
        let rate = self.params.decay_rate;
        for p in self.particles.iter_mut() {
            p.integrate(dt, gravity);
            p.decay(rate, dt);
        }
        let before = self.particles.len();
        self.particles.retain(Particle::is_live);
        let removed = before - self.particles.len();
        trace!("Pruned {} particles, {} live", removed, self.particles.len());
        removed
    }

    fn finish_burst(&mut self) {
        self.particles.clear();
        self.projectile = launch_record(&self.params);
        self.phase = if self.params.relaunch {
            Phase::Ascending
        } else {
            Phase::PreLaunch
        };
        debug!("Burst finished, back to {:?}", self.phase);
    }

    /// Drops any burst in flight and parks the projectile on the pad.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.projectile = launch_record(&self.params);
        self.phase = Phase::PreLaunch;
        self.restarted = true;
        debug!("Reset to PreLaunch");
    }

    /// Starts the ascent from the pad. Only has an effect in `PreLaunch`.
    pub fn launch(&mut self) -> bool {
        if self.phase != Phase::PreLaunch {
            return false;
        }
        self.phase = Phase::Ascending;
        self.restarted = true;
        debug!("Launched");
        true
    }
}
