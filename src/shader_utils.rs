use crate::error::{FireworkError, Result};
use std::borrow::Cow;

// These need to match the constants build.rs renders into the shader templates.
pub const WORKGROUP_SIZE: u32 = 64;
pub const SHAPE_VERTEX_COUNT: u32 = 3;

// Include rendered WGSL source by specifying a path relative to the shader
// source directory.
#[macro_export]
macro_rules! include_shader {
    ($path:literal) => {
        include_str!(concat!(env!("OUT_DIR"), "/shaders/", $path))
    };
}

pub fn work_groups_for(count: u32) -> u32 {
    (count as f64 / WORKGROUP_SIZE as f64).ceil() as u32
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageKind {
    Compute,
    // A module carrying both vertex and fragment entry points.
    Render,
}

/// A compiled shader module, tagged with what kind of pipeline it can be linked into.
pub struct Program {
    pub label: String,
    pub kind: StageKind,
    pub module: wgpu::ShaderModule,
}

impl Program {
    pub fn expect_kind(&self, kind: StageKind) -> Result<&wgpu::ShaderModule> {
        if self.kind != kind {
            return Err(FireworkError::ResourceCompilation {
                label: self.label.clone(),
                message: format!("expected a {:?} program, got {:?}", kind, self.kind),
            });
        }
        Ok(&self.module)
    }
}

// Compiles shader sources and links pipelines, turning wgpu validation failures into
// errors instead of letting the default handler panic.
pub struct ProgramLoader<'a> {
    device: &'a wgpu::Device,
}

impl<'a> ProgramLoader<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        ProgramLoader { device }
    }

    pub fn load(&self, label: &str, source: &str, kind: StageKind) -> Result<Program> {
        log::info!("Compiling {:?} program: {}", kind, label);
        let module = self.link(label, |device| {
            device.create_shader_module(&wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        })?;
        Ok(Program {
            label: label.to_owned(),
            kind,
            module,
        })
    }

    /// Runs `build` inside a validation error scope.
    pub fn link<T>(&self, label: &str, build: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = build(self.device);
        match futures::executor::block_on(self.device.pop_error_scope()) {
            Some(err) => {
                log::error!("Failed to build {}: {}", label, err);
                Err(FireworkError::ResourceCompilation {
                    label: label.to_owned(),
                    message: err.to_string(),
                })
            }
            None => Ok(built),
        }
    }
}
