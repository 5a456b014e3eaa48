use crate::simulation::Phase;
use serde::{Deserialize, Serialize};

/// Where the per-frame Euler step of decaying particles runs. Both backends advance the
/// host records, which stay the source of truth for liveness and the phase; they only
/// differ in how the device buffer is brought up to date.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationBackend {
    // Re-upload every changed record each frame.
    Host,
    // Upload only when the live set changes membership, otherwise run the integrate
    // kernel over the records already resident on the device.
    Device,
}

/// What a single `ParticleSystem::update` did to the instance records.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameChange {
    pub dt: f32,
    // Records moved (projectile or particles).
    pub moved: bool,
    pub exploded: bool,
    // Particles pruned this frame.
    pub removed: usize,
    // The burst finished and the projectile went back to the pad.
    pub relaunched: bool,
    // `reset` or `launch` was called since the last frame.
    pub restarted: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BufferSync {
    Unchanged,
    // Push every host instance record to the device buffer.
    Upload,
    // Advance the resident records on the device by `dt`.
    Integrate { dt: f32 },
}

impl IntegrationBackend {
    pub fn sync_for(&self, change: &FrameChange, phase: Phase) -> BufferSync {
        let membership_changed =
            change.exploded || change.removed > 0 || change.relaunched || change.restarted;
        if membership_changed {
            return BufferSync::Upload;
        }
        if !change.moved {
            return BufferSync::Unchanged;
        }
        match (self, phase) {
            (IntegrationBackend::Device, Phase::Decaying) => BufferSync::Integrate { dt: change.dt },
            // The projectile is a single record, and the host needs it for apex detection.
            _ => BufferSync::Upload,
        }
    }
}

impl BufferSync {
    /// Combines the syncs of two updates that ran without a render in between. Two
    /// device steps can't be folded into one dispatch, so they fall back to an upload.
    pub fn merge(self, later: BufferSync) -> BufferSync {
        match (self, later) {
            (BufferSync::Unchanged, sync) | (sync, BufferSync::Unchanged) => sync,
            _ => BufferSync::Upload,
        }
    }
}
