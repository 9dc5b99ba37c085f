pub mod client;
pub mod models;

pub use client::{DefaultGithubClient, GithubClient};
pub use models::{Artifact, ArtifactList, WorkflowRun, WorkflowRunList};
