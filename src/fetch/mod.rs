pub mod archive;
pub mod error;
pub mod fetcher;

pub use error::Error;
pub use fetcher::{ArtifactFetcher, FetchSettings, FetchSummary};
