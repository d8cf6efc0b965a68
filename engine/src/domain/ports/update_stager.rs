//! UpdateStager port
//! Hands a downloaded application binary to an external replace-and-relaunch step

use crate::domain::DomainError;

/// Port for staging a self-update
pub trait UpdateStager: Send + Sync {
    /// Persist `binary` and trigger the replacement. Once this returns `Ok`,
    /// the current process is expected to shut down.
    fn stage_update(&self, binary: &[u8]) -> Result<(), DomainError>;
}
