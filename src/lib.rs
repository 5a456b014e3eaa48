pub mod app;
pub mod buffer_util;
pub mod error;
pub mod fps_estimator;
pub mod geometry;
pub mod integration;
pub mod params;
pub mod particle_buffer;
pub mod particles;
pub mod render_style;
pub mod renderer;
pub mod shader_utils;
pub mod simulation;
pub mod transform;

pub use app::Firework;
pub use error::{FireworkError, Result};
pub use params::FireworkParams;
