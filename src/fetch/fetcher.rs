use super::archive::{extract_archive, prepare_directory, write_archive};
use super::Error;
use crate::common::TimeWindow;
use crate::github::{Artifact, GithubClient};
use log::{debug, info};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub workflow_id: String,
    pub window: TimeWindow,
    pub zips_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Only artifacts whose name contains this are downloaded.
    pub artifact_filter: String,
    pub extract: bool,
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct FetchSummary {
    pub runs: usize,
    pub artifacts: usize,
}

/// Downloads the test report artifacts of every run of a workflow created within a time window.
pub struct ArtifactFetcher<G> {
    github: G,
    settings: FetchSettings,
}

impl<G> ArtifactFetcher<G>
where
    G: GithubClient,
{
    pub fn new(github: G, settings: FetchSettings) -> Self {
        Self { github, settings }
    }

    pub async fn run(&self) -> Result<FetchSummary, Error> {
        prepare_directory(&self.settings.zips_dir)?;
        prepare_directory(&self.settings.data_dir)?;

        let run_ids = self.collect_run_ids().await?;
        if run_ids.is_empty() {
            return Err(Error::NoRunsFound(self.settings.window.clone()));
        }
        let mut summary = FetchSummary {
            runs: run_ids.len(),
            artifacts: 0,
        };
        for run_id in run_ids {
            info!("Downloading artifacts from run {}...", run_id);
            summary.artifacts += self.download_run_artifacts(run_id).await?;
        }
        info!(
            "Downloaded {} artifacts from {} runs",
            summary.artifacts, summary.runs
        );
        Ok(summary)
    }

    /// Walks every page of workflow runs, keeping the ids of the ones inside the time window.
    pub async fn collect_run_ids(&self) -> Result<Vec<u64>, Error> {
        let mut run_ids = Vec::new();
        let mut page_url = None;
        loop {
            let page = self
                .github
                .workflow_runs(&self.settings.workflow_id, page_url)
                .await?;
            run_ids.extend(
                page.items
                    .iter()
                    .filter(|run| self.settings.window.contains(&run.created_at))
                    .map(|run| run.id),
            );
            match page.next {
                Some(next) => {
                    info!("retrieving from {}, num runs: {}", next, run_ids.len());
                    page_url = Some(next);
                }
                None => break,
            }
        }
        Ok(run_ids)
    }

    /// Downloads the matching artifacts of a run, returning how many were saved.
    pub async fn download_run_artifacts(&self, run_id: u64) -> Result<usize, Error> {
        let artifacts = self.github.run_artifacts(run_id).await?;
        let mut downloaded = 0;
        for artifact in artifacts.iter().filter(|a| self.matches_filter(a)) {
            self.download_artifact(artifact).await?;
            downloaded += 1;
        }
        Ok(downloaded)
    }

    async fn download_artifact(&self, artifact: &Artifact) -> Result<(), Error> {
        debug!("Downloading artifact '{}'", artifact.name);
        let contents = self.github.download_artifact(artifact).await?;
        let archive_path = write_archive(
            &self.settings.zips_dir,
            &artifact.archive_file_name(),
            &contents,
        )?;
        if self.settings.extract {
            let destination = self.settings.data_dir.join(&artifact.name);
            extract_archive(&archive_path, &destination)?;
        }
        Ok(())
    }

    fn matches_filter(&self, artifact: &Artifact) -> bool {
        artifact.name.contains(&self.settings.artifact_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{self, Page};
    use crate::github::client::MockGithubClient;
    use crate::github::WorkflowRun;
    use chrono::{DateTime, Utc};
    use mockall::predicate::eq;
    use reqwest::StatusCode;
    use std::fs;
    use tempfile::TempDir;

    fn run(id: u64, created_at: &str) -> WorkflowRun {
        WorkflowRun {
            id,
            created_at: created_at.parse::<DateTime<Utc>>().unwrap(),
        }
    }

    fn artifact(name: &str) -> Artifact {
        Artifact {
            name: name.into(),
            archive_download_url: format!("https://api.github.com/artifacts/{}/zip", name),
        }
    }

    fn settings(root: &TempDir) -> FetchSettings {
        FetchSettings {
            workflow_id: "ci.yml".into(),
            window: TimeWindow::parse("2024-01-01T00:00:00Z", "2024-01-31T23:59:59Z").unwrap(),
            zips_dir: root.path().join("zips"),
            data_dir: root.path().join("data"),
            artifact_filter: "Test Results".into(),
            extract: false,
        }
    }

    #[tokio::test]
    async fn collects_runs_across_pages() {
        let root = TempDir::new().unwrap();
        let mut github = MockGithubClient::new();
        github
            .expect_workflow_runs()
            .with(eq("ci.yml"), eq(None::<String>))
            .times(1)
            .returning(|_, _| {
                Ok(Page {
                    items: vec![
                        run(3, "2024-02-03T10:00:00Z"),
                        run(2, "2024-01-31T23:59:59Z"),
                    ],
                    next: Some("https://api.github.com/runs?page=2".into()),
                })
            });
        github
            .expect_workflow_runs()
            .with(
                eq("ci.yml"),
                eq(Some("https://api.github.com/runs?page=2".to_string())),
            )
            .times(1)
            .returning(|_, _| {
                Ok(Page {
                    items: vec![
                        run(1, "2024-01-01T00:00:00Z"),
                        run(0, "2023-12-31T23:59:59Z"),
                    ],
                    next: None,
                })
            });

        let fetcher = ArtifactFetcher::new(github, settings(&root));
        assert_eq!(fetcher.collect_run_ids().await.unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn no_runs_in_window() {
        let root = TempDir::new().unwrap();
        let mut github = MockGithubClient::new();
        github.expect_workflow_runs().returning(|_, _| {
            Ok(Page {
                items: vec![run(1, "2023-06-01T00:00:00Z")],
                next: None,
            })
        });
        github.expect_run_artifacts().never();
        github.expect_download_artifact().never();

        let fetcher = ArtifactFetcher::new(github, settings(&root));
        let error = fetcher.run().await.unwrap_err();
        assert!(error.no_runs_found());
        assert_eq!(fs::read_dir(root.path().join("zips")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn downloads_matching_artifacts() {
        let root = TempDir::new().unwrap();
        let mut github = MockGithubClient::new();
        github.expect_workflow_runs().returning(|_, _| {
            Ok(Page {
                items: vec![run(7, "2024-01-10T00:00:00Z")],
                next: None,
            })
        });
        github
            .expect_run_artifacts()
            .with(eq(7u64))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    artifact("Unit Test Results"),
                    artifact("coverage-report"),
                ])
            });
        github
            .expect_download_artifact()
            .withf(|artifact| artifact.name == "Unit Test Results")
            .times(1)
            .returning(|_| Ok(b"zip bytes".to_vec()));

        let fetcher = ArtifactFetcher::new(github, settings(&root));
        let summary = fetcher.run().await.unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                runs: 1,
                artifacts: 1
            }
        );
        assert_eq!(
            fs::read(root.path().join("zips/Unit Test Results.zip")).unwrap(),
            b"zip bytes"
        );
        assert!(root.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn http_failure_aborts() {
        let root = TempDir::new().unwrap();
        let mut github = MockGithubClient::new();
        github.expect_workflow_runs().returning(|_, _| {
            Ok(Page {
                items: vec![run(7, "2024-01-10T00:00:00Z"), run(8, "2024-01-11T00:00:00Z")],
                next: None,
            })
        });
        github
            .expect_run_artifacts()
            .times(1)
            .returning(|_| Err(client::Error::Http(StatusCode::FORBIDDEN)));

        let fetcher = ArtifactFetcher::new(github, settings(&root));
        let error = fetcher.run().await.unwrap_err();
        assert!(matches!(
            error,
            Error::Client(client::Error::Http(StatusCode::FORBIDDEN))
        ));
    }

    #[tokio::test]
    async fn expired_artifact_aborts() {
        let root = TempDir::new().unwrap();
        let mut github = MockGithubClient::new();
        github.expect_workflow_runs().returning(|_, _| {
            Ok(Page {
                items: vec![run(7, "2024-01-10T00:00:00Z")],
                next: None,
            })
        });
        github.expect_run_artifacts().returning(|_| {
            Ok(vec![
                artifact("Integration Test Results"),
                artifact("Unit Test Results"),
            ])
        });
        github
            .expect_download_artifact()
            .times(1)
            .returning(|_| Err(client::Error::Http(StatusCode::GONE)));

        let fetcher = ArtifactFetcher::new(github, settings(&root));
        let error = fetcher.run().await.unwrap_err();
        assert!(matches!(
            error,
            Error::Client(client::Error::Http(StatusCode::GONE))
        ));
        assert_eq!(fs::read_dir(root.path().join("zips")).unwrap().count(), 0);
    }
}
