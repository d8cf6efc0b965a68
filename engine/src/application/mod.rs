pub mod app;
pub mod defaults;
pub mod engine_controller;
pub mod engine_installer;
pub mod registry;
pub mod self_update;
pub mod sync_orchestrator;

pub use app::App;
pub use defaults::DefaultResources;
pub use engine_controller::EngineProcessController;
pub use engine_installer::{EngineDistribution, EngineInstaller};
pub use registry::{AppContext, AppOptions, Ports};
pub use self_update::{SelfUpdateOutcome, SelfUpdater};
pub use sync_orchestrator::{SyncOrchestrator, SyncReport};
