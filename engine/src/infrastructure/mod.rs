pub mod appdata;
pub mod http_fetcher;
pub mod persistent_store;
pub mod resource_registry;
pub mod shell_update_stager;
pub mod tag_page_locator;

pub use appdata::{validate_entry_name, AppPaths};
pub use http_fetcher::HttpFetcher;
pub use persistent_store::PersistentStore;
pub use resource_registry::ResourceRegistry;
pub use shell_update_stager::ShellUpdateStager;
pub use tag_page_locator::{ReleaseSource, TagPageLocator};
