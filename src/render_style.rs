use crate::geometry;
use crate::params::FireworkParams;
use serde::{Deserialize, Serialize};

/// How a fragment's alpha falls off with its distance from the local center.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloffPolicy {
    // Smooth core plus an exponential halo, brighter for bigger particles.
    Glow,
    // Smooth core, fragments outside the incircle are discarded.
    HardEdge,
}

impl FalloffPolicy {
    pub fn fragment_entry_point(&self) -> &'static str {
        match self {
            FalloffPolicy::Glow => "fs_glow",
            FalloffPolicy::HardEdge => "fs_hard_edge",
        }
    }
}

// Must match Style in particle.wgsl.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct StyleUniforms {
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub center: [f32; 2],
    pub radius: f32,
    pub inv_life_span: f32,
    pub glow_falloff: f32,
    pub glow_boost: f32,
    _padding: [f32; 2],
}

impl StyleUniforms {
    pub fn new(params: &FireworkParams) -> Self {
        let shape = &params.shape;
        let style = &params.style;
        StyleUniforms {
            start_color: style.start_color,
            end_color: style.end_color,
            center: geometry::shape_center(shape.style, shape.size),
            radius: geometry::shape_inradius(shape.style, shape.size),
            inv_life_span: 1.0 / params.life.max,
            glow_falloff: style.glow_falloff,
            glow_boost: style.glow_boost,
            _padding: [0.0; 2],
        }
    }
}

fn smooth_core(d: f32, radius: f32) -> f32 {
    let t = (1.0 - d / radius).max(0.0).min(1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = a[i] * (1.0 - t) + b[i] * t;
    }
    out
}

/// Host copy of the fragment stages in particle.wgsl. `None` means the fragment is
/// discarded.
pub fn shade(
    uniforms: &StyleUniforms,
    policy: FalloffPolicy,
    local: [f32; 2],
    life: f32,
    size: f32,
) -> Option<[f32; 4]> {
    let dx = local[0] - uniforms.center[0];
    let dy = local[1] - uniforms.center[1];
    let d = (dx * dx + dy * dy).sqrt();
    let fraction = (life * uniforms.inv_life_span).max(0.0).min(1.0);
    let color = mix(uniforms.end_color, uniforms.start_color, fraction);
    match policy {
        FalloffPolicy::Glow => {
            let glow = (-d * uniforms.glow_falloff).exp() * uniforms.glow_boost * size;
            let alpha = ((smooth_core(d, uniforms.radius) + glow) * fraction)
                .max(0.0)
                .min(1.0);
            Some([
                color[0] * (1.0 + glow),
                color[1] * (1.0 + glow),
                color[2] * (1.0 + glow),
                alpha * color[3],
            ])
        }
        FalloffPolicy::HardEdge => {
            if d > uniforms.radius {
                return None;
            }
            Some([
                color[0],
                color[1],
                color[2],
                smooth_core(d, uniforms.radius) * fraction * color[3],
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms() -> StyleUniforms {
        StyleUniforms::new(&FireworkParams::default())
    }

    #[test]
    fn layout_matches_shader() {
        assert_eq!(std::mem::size_of::<StyleUniforms>(), 64);
    }

    #[test]
    fn alpha_decreases_with_distance() {
        let u = uniforms();
        for policy in [FalloffPolicy::Glow, FalloffPolicy::HardEdge].iter() {
            let mut last = f32::INFINITY;
            for step in 0..=10 {
                let x = u.radius * step as f32 / 10.0;
                let alpha = shade(&u, *policy, [x, 0.0], 1.0, 0.02).unwrap()[3];
                assert!(alpha <= last, "{:?} at {}", policy, x);
                last = alpha;
            }
        }
    }

    #[test]
    fn glow_has_no_hard_edge() {
        let u = uniforms();
        let inside = shade(&u, FalloffPolicy::Glow, [u.radius * 0.999, 0.0], 1.0, 0.02).unwrap();
        let outside = shade(&u, FalloffPolicy::Glow, [u.radius * 1.001, 0.0], 1.0, 0.02).unwrap();
        assert!((inside[3] - outside[3]).abs() < 1e-2);
        assert!(outside[3] > 0.0);
    }

    #[test]
    fn hard_edge_discards_outside_radius() {
        let u = uniforms();
        assert!(shade(&u, FalloffPolicy::HardEdge, [u.radius * 1.01, 0.0], 1.0, 0.02).is_none());
        assert!(shade(&u, FalloffPolicy::HardEdge, [u.radius * 0.5, 0.0], 1.0, 0.02).is_some());
    }

    #[test]
    fn color_lerps_with_life() {
        let u = uniforms();
        let full = shade(&u, FalloffPolicy::HardEdge, u.center, 1.0 / u.inv_life_span, 0.02).unwrap();
        let empty = shade(&u, FalloffPolicy::HardEdge, u.center, 0.0, 0.02).unwrap();
        let half = shade(&u, FalloffPolicy::HardEdge, u.center, 0.5 / u.inv_life_span, 0.02).unwrap();
        for i in 0..3 {
            assert!((full[i] - u.start_color[i]).abs() < 1e-6);
            assert!((empty[i] - u.end_color[i]).abs() < 1e-6);
            let midpoint = 0.5 * (u.start_color[i] + u.end_color[i]);
            assert!((half[i] - midpoint).abs() < 1e-5);
        }
        // Fully decayed particles are invisible.
        assert_eq!(empty[3], 0.0);
    }

    #[test]
    fn bigger_particles_glow_brighter() {
        let u = uniforms();
        let small = shade(&u, FalloffPolicy::Glow, [u.radius, 0.0], 0.5, 0.01).unwrap();
        let big = shade(&u, FalloffPolicy::Glow, [u.radius, 0.0], 0.5, 0.03).unwrap();
        assert!(big[0] > small[0]);
        assert!(big[3] >= small[3]);
    }
}
