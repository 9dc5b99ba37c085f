use crate::common::{InvalidTimestampError, RepoIdentifier, TimeWindow};
use crate::fetch::FetchSettings;
use crate::report::{AggregationSettings, GroupingKey, LinkSettings};
use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Flat variables understood for compatibility with the original `.env` based setup, mapped to
/// the configuration key they set.
const LEGACY_VARIABLES: &[(&str, &str)] = &[
    ("OWNER", "github.owner"),
    ("REPO", "github.repo"),
    ("TOKEN", "github.token"),
    ("WORKFLOW_ID", "fetch.workflow_id"),
    ("START_TIME", "fetch.start_time"),
    ("END_TIME", "fetch.end_time"),
    ("DESTINATION_DIR_ZIPS", "fetch.zips_dir"),
    ("DESTINATION_DIR_DATA", "fetch.data_dir"),
];

#[derive(Deserialize, Debug)]
pub struct FlakemeterConfig {
    pub github: GithubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Deserialize, Debug)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Deserialize, Debug)]
pub struct FetchConfig {
    pub workflow_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default = "default_zips_dir")]
    pub zips_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_artifact_filter")]
    pub artifact_filter: String,
    #[serde(default)]
    pub extract: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workflow_id: None,
            start_time: None,
            end_time: None,
            zips_dir: default_zips_dir(),
            data_dir: default_data_dir(),
            artifact_filter: default_artifact_filter(),
            extract: false,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct AnalysisConfig {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_flaky_threshold")]
    pub flaky_threshold: f64,
    #[serde(default)]
    pub group_by: GroupingKey,
    #[serde(default)]
    pub links: LinksConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            output: default_output(),
            flaky_threshold: default_flaky_threshold(),
            group_by: GroupingKey::default(),
            links: LinksConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct LinksConfig {
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_folders")]
    pub folders: BTreeMap<String, String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            folders: default_folders(),
        }
    }
}

impl FlakemeterConfig {
    pub fn new(config_file_path: &str) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        let config_file_path = shellexpand::tilde(config_file_path);
        config.merge(File::with_name(&config_file_path).required(false))?;
        config.merge(Environment::with_prefix("flakemeter").separator("__"))?;
        apply_legacy_variables(&mut config, |name| std::env::var(name).ok())?;
        config.try_into()
    }

    pub fn repository(&self) -> RepoIdentifier {
        RepoIdentifier::new(&self.github.owner, &self.github.repo)
    }

    /// The API token, which is only required when talking to GitHub.
    pub fn token(&self) -> Result<&str, InvalidConfigError> {
        self.github
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(InvalidConfigError::Missing("github.token"))
    }

    pub fn fetch_settings(&self) -> Result<FetchSettings, InvalidConfigError> {
        let fetch = &self.fetch;
        let workflow_id = fetch
            .workflow_id
            .clone()
            .ok_or(InvalidConfigError::Missing("fetch.workflow_id"))?;
        let start_time = fetch
            .start_time
            .as_deref()
            .ok_or(InvalidConfigError::Missing("fetch.start_time"))?;
        let end_time = fetch
            .end_time
            .as_deref()
            .ok_or(InvalidConfigError::Missing("fetch.end_time"))?;
        Ok(FetchSettings {
            workflow_id,
            window: TimeWindow::parse(start_time, end_time)?,
            zips_dir: fetch.zips_dir.clone(),
            data_dir: fetch.data_dir.clone(),
            artifact_filter: fetch.artifact_filter.clone(),
            extract: fetch.extract,
        })
    }

    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            group_by: self.analysis.group_by,
            flaky_threshold: self.analysis.flaky_threshold,
        }
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            repository: self.repository(),
            branch: self.analysis.links.branch.clone(),
            folders: self.analysis.links.folders.clone(),
        }
    }
}

fn apply_legacy_variables<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for &(variable, key) in LEGACY_VARIABLES {
        if let Some(value) = lookup(variable) {
            config.set(key, value)?;
        }
    }
    Ok(())
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid time window: {0}")]
    InvalidTimeWindow(#[from] InvalidTimestampError),
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_zips_dir() -> PathBuf {
    "./zips".into()
}

fn default_data_dir() -> PathBuf {
    "./data".into()
}

fn default_artifact_filter() -> String {
    "Test Results".into()
}

fn default_reports_dir() -> PathBuf {
    "./temp".into()
}

fn default_output() -> PathBuf {
    "test_data.csv".into()
}

fn default_flaky_threshold() -> f64 {
    5.0
}

fn default_branch() -> String {
    "main".into()
}

fn default_folders() -> BTreeMap<String, String> {
    [
        ("foundation", "foundation/test/source"),
        ("communicator", "communicator/test/source"),
        ("ests", "ests-pubsub/src/test/java"),
        ("events", "lib-events/test/java"),
        ("reportprocessor", "report-processor/src/test/java"),
        ("webapp", "gui/test/src"),
        (
            "contractorservice",
            "libs/communicator/contractor-service-client",
        ),
    ]
    .into_iter()
    .map(|(module, folder)| (module.to_string(), folder.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn load(yaml: &str, variables: &[(&str, &str)]) -> FlakemeterConfig {
        let variables: HashMap<String, String> = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::new();
        config.merge(File::from_str(yaml, FileFormat::Yaml)).unwrap();
        apply_legacy_variables(&mut config, |name| variables.get(name).cloned()).unwrap();
        config.try_into().unwrap()
    }

    #[test]
    fn defaults() {
        let config = load("github:\n  owner: acme\n  repo: platform\n", &[]);
        assert_eq!(config.repository(), RepoIdentifier::new("acme", "platform"));
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.fetch.artifact_filter, "Test Results");
        assert!(!config.fetch.extract);
        assert_eq!(config.analysis.reports_dir, PathBuf::from("./temp"));
        assert_eq!(config.analysis.output, PathBuf::from("test_data.csv"));
        assert_eq!(config.analysis.flaky_threshold, 5.0);
        assert_eq!(config.analysis.group_by, GroupingKey::Name);
        assert_eq!(config.analysis.links.branch, "main");
        assert_eq!(
            config.analysis.links.folders.get("webapp").map(String::as_str),
            Some("gui/test/src")
        );
    }

    #[test]
    fn missing_token() {
        let config = load("github:\n  owner: acme\n  repo: platform\n", &[]);
        assert_eq!(
            config.token(),
            Err(InvalidConfigError::Missing("github.token"))
        );
    }

    #[test]
    fn missing_fetch_settings() {
        let config = load("github:\n  owner: acme\n  repo: platform\n", &[]);
        assert_eq!(
            config.fetch_settings().unwrap_err(),
            InvalidConfigError::Missing("fetch.workflow_id")
        );
    }

    #[test]
    fn legacy_variables() {
        let config = load(
            "github:\n  owner: file-owner\n  repo: platform\n",
            &[
                ("OWNER", "acme"),
                ("TOKEN", "ghp_secret"),
                ("WORKFLOW_ID", "ci.yml"),
                ("START_TIME", "2024-01-01T00:00:00Z"),
                ("END_TIME", "2024-02-01T00:00:00Z"),
                ("DESTINATION_DIR_ZIPS", "/tmp/zips"),
            ],
        );
        assert_eq!(config.github.owner, "acme");
        assert_eq!(config.token(), Ok("ghp_secret"));

        let settings = config.fetch_settings().unwrap();
        assert_eq!(settings.workflow_id, "ci.yml");
        assert_eq!(settings.zips_dir, PathBuf::from("/tmp/zips"));
        assert_eq!(settings.data_dir, PathBuf::from("./data"));
        assert_eq!(
            settings.window,
            TimeWindow::parse("2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn invalid_window() {
        let config = load(
            "github:\n  owner: acme\n  repo: platform\nfetch:\n  workflow_id: '42'\n  start_time: last week\n  end_time: '2024-02-01'\n",
            &[],
        );
        assert!(matches!(
            config.fetch_settings(),
            Err(InvalidConfigError::InvalidTimeWindow(_))
        ));
    }

    #[test]
    fn analysis_overrides() {
        let config = load(
            r#"
github:
  owner: acme
  repo: platform
analysis:
  flaky_threshold: 10.5
  group_by: class_and_name
  links:
    branch: develop
    folders:
      billing: services/billing/src/test/java
"#,
            &[],
        );
        let aggregation = config.aggregation_settings();
        assert_eq!(aggregation.flaky_threshold, 10.5);
        assert_eq!(aggregation.group_by, GroupingKey::ClassAndName);

        let links = config.link_settings();
        assert_eq!(links.branch, "develop");
        assert_eq!(links.folders.len(), 1);
        assert_eq!(
            links.folders.get("billing").map(String::as_str),
            Some("services/billing/src/test/java")
        );
    }
}
