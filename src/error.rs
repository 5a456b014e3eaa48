use thiserror::Error;

#[derive(Debug, Error)]
pub enum FireworkError {
    /// A kernel or stage failed to compile, or a pipeline failed to link. Shaders are
    /// static so this is only ever raised during startup.
    #[error("failed to build {label}: {message}")]
    ResourceCompilation { label: String, message: String },

    #[error("invalid firework params: {0}")]
    InvalidParams(String),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface has no supported format for this adapter")]
    Surface,

    #[error("failed to map buffer for read back: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FireworkError>;
