//! Domain-level errors
//! One enum for every failure the engine manager can surface

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // Installer errors
    #[error("Version {0} not found")]
    VersionNotFound(String),

    #[error("Tarball {0} not found")]
    TarballNotFound(String),

    #[error("Tarball unpack error: {0}")]
    UnpackFailed(String),

    #[error("No engine release available")]
    NoReleases,

    #[error("Engine is not installed")]
    NotInstalled,

    // Resource sync errors
    #[error("Failed to sync '{name}': {reason}")]
    ResourceSync { name: String, reason: String },

    // Process errors
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    // Store errors
    #[error("Store '{path}' is unreadable: {reason}")]
    Store { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),

    // Network errors
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Operation cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DomainError {
    /// Stable machine-readable code, used by the management UI collaborator
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::VersionNotFound(_) => "VER_NOT_FOUND",
            DomainError::TarballNotFound(_) => "TAR_NOT_FOUND",
            DomainError::UnpackFailed(_) => "UNTAR_FAILED",
            DomainError::NoReleases => "NO_RELEASES",
            DomainError::NotInstalled => "NOT_INSTALLED",
            DomainError::ResourceSync { .. } => "SYNC_FAILED",
            DomainError::Spawn(_) => "SPAWN_FAILED",
            DomainError::Store { .. } => "STORE_FAILED",
            DomainError::Io(_) => "IO_FAILED",
            DomainError::Http { .. } => "HTTP_FAILED",
            DomainError::HttpStatus { .. } => "HTTP_STATUS",
            DomainError::Cancelled => "CANCELLED",
            DomainError::InvalidConfiguration(_) => "INVALID_CONFIG",
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
