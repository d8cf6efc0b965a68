pub mod engine_state;
pub mod entries;
pub mod namespace;
pub mod platform;
pub mod release;
pub mod sync_scope;

pub use engine_state::EngineState;
pub use entries::{FileEntry, ProfileEntry, StartupScripts};
pub use namespace::Namespace;
pub use platform::TargetPlatform;
pub use release::EngineRelease;
pub use sync_scope::SyncScope;
