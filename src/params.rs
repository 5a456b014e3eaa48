use crate::error::{FireworkError, Result};
use crate::geometry::{ShapeSource, ShapeStyle};
use crate::integration::IntegrationBackend;
use crate::render_style::FalloffPolicy;
use rand::Rng;
use serde::{Deserialize, Serialize};

// Parameters that define the firework. These don't change at runtime.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FireworkParams {
    // Maximum number of particle records the device buffer holds.
    pub capacity: u32,
    // Particles requested per explosion, truncated to `capacity`.
    pub burst_count: u32,
    pub gravity: f32,
    pub decay_rate: f32,

    pub launch_position: [f32; 2],
    pub launch_velocity: [f32; 2],
    pub projectile_size: f32,

    // When false, a finished burst parks the projectile on the pad until `launch`.
    pub relaunch: bool,
    pub integration: IntegrationBackend,

    // Tables last, toml can't serialize plain values after them.
    pub speed: SampleBand,
    pub size: SampleBand,
    pub life: SampleBand,

    #[serde(default)]
    pub shape: ShapeParams,

    #[serde(default)]
    pub style: StyleParams,

    #[serde(default)]
    pub view: ViewParams,
}

/// Closed interval that explosion samples are drawn from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SampleBand {
    pub min: f32,
    pub max: f32,
}

impl SampleBand {
    pub fn new(min: f32, max: f32) -> Self {
        SampleBand { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    fn check(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(FireworkError::InvalidParams(format!(
                "{} band must be finite, got [{}, {}]",
                name, self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(FireworkError::InvalidParams(format!(
                "{} band is inverted: [{}, {}]",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ShapeParams {
    pub style: ShapeStyle,
    pub source: ShapeSource,
    // Scale of the local triangle, before the per-particle size is applied.
    pub size: f32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        ShapeParams {
            style: ShapeStyle::Equilateral,
            source: ShapeSource::Kernel,
            size: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct StyleParams {
    pub falloff: FalloffPolicy,
    // Color of a particle at full life, and as its life runs out.
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub glow_falloff: f32,
    pub glow_boost: f32,
    pub background: [f32; 4],
}

impl Default for StyleParams {
    fn default() -> Self {
        StyleParams {
            falloff: FalloffPolicy::Glow,
            start_color: [1.0, 0.9, 0.5, 1.0],
            end_color: [0.8, 0.1, 0.05, 1.0],
            glow_falloff: 4.0,
            glow_boost: 8.0,
            background: [0.0, 0.0, 0.02, 1.0],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ViewParams {
    // Half of the visible world height at zoom 1.
    pub extent: f32,
    pub initial_zoom: f32,
    pub min_zoom: f32,
    pub camera_center: [f32; 2],
    pub world_scale: f32,
    pub world_offset: [f32; 2],
}

impl Default for ViewParams {
    fn default() -> Self {
        ViewParams {
            extent: 1.6,
            initial_zoom: 1.0,
            min_zoom: 0.05,
            camera_center: [0.0, 0.2],
            world_scale: 1.0,
            world_offset: [0.0, 0.0],
        }
    }
}

impl FireworkParams {
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let params: FireworkParams = std::fs::read_to_string(path)?.parse()?;
        params.validate()?;
        Ok(params)
    }

    /// Number of particles an explosion actually produces.
    pub fn burst_size(&self) -> usize {
        std::cmp::min(self.burst_count, self.capacity) as usize
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FireworkError::InvalidParams(msg));
        if self.capacity == 0 {
            return invalid("capacity must be at least 1".to_owned());
        }
        if self.burst_count == 0 {
            return invalid("burst_count must be at least 1".to_owned());
        }
        let mut launch = self.launch_position.iter().chain(self.launch_velocity.iter());
        if !launch.all(|x| x.is_finite()) {
            return invalid(format!(
                "launch position and velocity must be finite, got {:?} and {:?}",
                self.launch_position, self.launch_velocity
            ));
        }
        if !(self.gravity.is_finite() && self.gravity < 0.0) {
            return invalid(format!("gravity must be negative, got {}", self.gravity));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate > 0.0) {
            return invalid(format!("decay_rate must be positive, got {}", self.decay_rate));
        }
        if !(self.projectile_size.is_finite() && self.projectile_size > 0.0) {
            return invalid(format!(
                "projectile_size must be positive, got {}",
                self.projectile_size
            ));
        }
        self.speed.check("speed")?;
        self.size.check("size")?;
        self.life.check("life")?;
        if self.speed.min < 0.0 {
            return invalid(format!("speed band must be non-negative, got {}", self.speed.min));
        }
        if self.size.min <= 0.0 {
            return invalid(format!("size band must be positive, got {}", self.size.min));
        }
        if self.life.min <= 0.0 {
            return invalid(format!("life band must be positive, got {}", self.life.min));
        }
        if !(self.shape.size.is_finite() && self.shape.size > 0.0) {
            return invalid(format!("shape size must be positive, got {}", self.shape.size));
        }
        if !(self.view.min_zoom.is_finite() && self.view.min_zoom > 0.0) {
            return invalid(format!("min_zoom must be positive, got {}", self.view.min_zoom));
        }
        if !(self.view.extent.is_finite() && self.view.extent > 0.0) {
            return invalid(format!("view extent must be positive, got {}", self.view.extent));
        }
        Ok(())
    }
}

impl std::str::FromStr for FireworkParams {
    type Err = toml::de::Error;
    fn from_str(serialized: &str) -> std::result::Result<Self, Self::Err> {
        let params = toml::from_str(serialized)?;
        Ok(params)
    }
}

impl Default for FireworkParams {
    fn default() -> Self {
        FireworkParams {
            capacity: 512,
            burst_count: 400,
            gravity: -2.0,
            decay_rate: 1.0,
            launch_position: [0.0, -1.0],
            launch_velocity: [0.0, 3.0],
            projectile_size: 0.04,
            relaunch: true,
            integration: IntegrationBackend::Host,
            speed: SampleBand::new(0.3, 1.2),
            size: SampleBand::new(0.01, 0.03),
            life: SampleBand::new(0.8, 1.6),
            shape: ShapeParams::default(),
            style: StyleParams::default(),
            view: ViewParams::default(),
        }
    }
}

pub fn get_params_from_default_file() -> FireworkParams {
    let config_data = include_str!("../firework_config.toml");
    match config_data.parse::<FireworkParams>() {
        Ok(params) => params,
        Err(e) => {
            log::error!(
                "Failed to parse config file({}): {:?}",
                "../firework_config.toml",
                e
            );
            FireworkParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn smoke() {
        let params = FireworkParams {
            capacity: 50,
            burst_count: 50,
            integration: IntegrationBackend::Device,
            ..FireworkParams::default()
        };
        let serialized = toml::to_string(&params).unwrap();
        println!("serialized = {}", serialized);
        let deserialized: FireworkParams = toml::from_str(&serialized).unwrap();
        assert_eq!(params, deserialized);
    }

    #[test]
    fn default_file_parses_and_validates() {
        let params = get_params_from_default_file();
        params.validate().unwrap();
        let serialized = include_str!("../firework_config.toml");
        assert!(serialized.parse::<FireworkParams>().is_ok());
    }

    #[test]
    fn sections_are_optional() {
        let minimal = r#"
            capacity = 10
            burst_count = 20
            gravity = -2.0
            decay_rate = 1.0
            launch_position = [0.0, 0.0]
            launch_velocity = [0.0, 1.0]
            projectile_size = 0.1
            relaunch = false
            integration = "host"
            speed = { min = 0.1, max = 0.2 }
            size = { min = 0.1, max = 0.2 }
            life = { min = 0.5, max = 1.0 }
        "#;
        let params: FireworkParams = minimal.parse().unwrap();
        assert_eq!(params.shape, ShapeParams::default());
        assert_eq!(params.view, ViewParams::default());
        assert_eq!(params.burst_size(), 10);
        params.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_constants() {
        let good = FireworkParams::default();
        good.validate().unwrap();

        let cases = [
            FireworkParams {
                capacity: 0,
                ..good
            },
            FireworkParams {
                burst_count: 0,
                ..good
            },
            FireworkParams {
                launch_velocity: [0.0, f32::NAN],
                ..good
            },
            FireworkParams {
                launch_position: [f32::INFINITY, 0.0],
                ..good
            },
            FireworkParams {
                gravity: 1.0,
                ..good
            },
            FireworkParams {
                decay_rate: 0.0,
                ..good
            },
            FireworkParams {
                speed: SampleBand::new(2.0, 1.0),
                ..good
            },
            FireworkParams {
                size: SampleBand::new(0.0, 1.0),
                ..good
            },
            FireworkParams {
                life: SampleBand::new(f32::NAN, 1.0),
                ..good
            },
            FireworkParams {
                view: ViewParams {
                    min_zoom: 0.0,
                    ..good.view
                },
                ..good
            },
        ];
        for params in cases.iter() {
            assert!(
                matches!(params.validate(), Err(FireworkError::InvalidParams(_))),
                "{:?} should be rejected",
                params
            );
        }
    }

    #[test]
    fn band_sampling_stays_inside() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let band = SampleBand::new(0.25, 0.5);
        for _ in 0..1000 {
            assert!(band.contains(band.sample(&mut rng)));
        }
        let point = SampleBand::new(3.0, 3.0);
        assert_eq!(point.sample(&mut rng), 3.0);
    }
}
