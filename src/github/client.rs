use super::models::{Artifact, ArtifactList, WorkflowRun, WorkflowRunList};
use crate::client::{ApiClient, Page, Result};
use crate::common::RepoIdentifier;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GithubClient: Send + Sync {
    /// Fetches one page of runs for a workflow. `page_url` is the `next` link of a previous page,
    /// or `None` to start from the first one.
    async fn workflow_runs(
        &self,
        workflow_id: &str,
        page_url: Option<String>,
    ) -> Result<Page<Vec<WorkflowRun>>>;
    async fn run_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>>;
    async fn download_artifact(&self, artifact: &Artifact) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct DefaultGithubClient {
    client: ApiClient,
    api_url: String,
    repo: RepoIdentifier,
}

impl DefaultGithubClient {
    const PAGE_SIZE: u32 = 100;

    pub fn new<A, T>(api_url: A, repo: RepoIdentifier, token: T) -> Result<Self>
    where
        A: Into<String>,
        T: Into<String>,
    {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: ApiClient::from_token(token)?,
            api_url,
            repo,
        })
    }

    fn make_repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url, self.repo.owner, self.repo.repo
        )
    }
}

#[async_trait]
impl GithubClient for DefaultGithubClient {
    async fn workflow_runs(
        &self,
        workflow_id: &str,
        page_url: Option<String>,
    ) -> Result<Page<Vec<WorkflowRun>>> {
        let url = page_url.unwrap_or_else(|| {
            format!(
                "{}/actions/workflows/{}/runs?per_page={}",
                self.make_repo_url(),
                workflow_id,
                Self::PAGE_SIZE
            )
        });
        let page: Page<WorkflowRunList> = self.client.get_page(&url).await?;
        Ok(Page {
            items: page.items.workflow_runs,
            next: page.next,
        })
    }

    async fn run_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>> {
        let url = format!("{}/actions/runs/{}/artifacts", self.make_repo_url(), run_id);
        let list: ArtifactList = self.client.get(&url).await?;
        Ok(list.artifacts)
    }

    async fn download_artifact(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        self.client.download(&artifact.archive_download_url).await
    }
}
