// This should match the struct defined in particle.inc.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub life: f32,
    pub size: f32,
}

impl Particle {
    pub const SIZE: wgpu::BufferAddress = std::mem::size_of::<Particle>() as wgpu::BufferAddress;

    pub fn is_live(&self) -> bool {
        self.life > 0.0
    }

    /// Explicit Euler step under constant gravity: position moves with the velocity from
    /// the start of the step, then gravity is applied to the vertical velocity.
    pub fn integrate(&mut self, dt: f32, gravity: f32) {
        self.position[0] += self.velocity[0] * dt;
        self.position[1] += self.velocity[1] * dt;
        self.velocity[1] += gravity * dt;
    }

    pub fn decay(&mut self, rate: f32, dt: f32) {
        self.life -= rate * dt;
    }
}
