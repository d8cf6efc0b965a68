pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use value_objects::{
    EngineRelease, EngineState, FileEntry, Namespace, ProfileEntry, StartupScripts, SyncScope,
    TargetPlatform,
};
