pub mod archive;
pub mod argv;
pub mod hook_executor;
pub mod pe_subsystem;

pub use archive::{extract_binaries, ExtractedFile};
pub use argv::{build_engine_args, split_args, substitute_tokens, EngineArgsInput, NamedPath};
pub use hook_executor::execute_hook;
pub use pe_subsystem::patch_pe_subsystem;
