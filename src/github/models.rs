use chrono::{DateTime, Utc};
use serde_derive::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowRunList {
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    pub id: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ArtifactList {
    pub artifacts: Vec<Artifact>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub archive_download_url: String,
}

impl Artifact {
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}
