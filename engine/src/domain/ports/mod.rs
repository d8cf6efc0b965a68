pub mod fetcher;
pub mod release_locator;
pub mod update_stager;

pub use fetcher::Fetcher;
pub use release_locator::ReleaseLocator;
pub use update_stager::UpdateStager;
