pub mod client;
pub mod common;
pub mod config;
pub mod fetch;
pub mod github;
pub mod report;

pub use crate::config::FlakemeterConfig;
pub use fetch::{ArtifactFetcher, FetchSettings, FetchSummary};
pub use report::{AnalysisSummary, LinkAnnotator, ReportAnalyzer};
