use env_logger::Env;
use flakemeter::{
    github::DefaultGithubClient, ArtifactFetcher, FlakemeterConfig, LinkAnnotator,
    ReportAnalyzer,
};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::exit;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "flakemeter", about = "Finds flaky tests in GitHub Actions test reports")]
struct Options {
    /// The configuration file to use
    #[structopt(short, long, default_value = "~/.flakemeter.yaml")]
    config: String,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Download the test report artifacts of every workflow run in the configured time window
    Fetch,

    /// Aggregate test reports into a CSV of per test flakiness statistics
    Analyze {
        /// Directory to look for XML reports in, overriding the configured one
        #[structopt(long, parse(from_os_str))]
        reports_dir: Option<PathBuf>,

        /// Where to write the CSV, overriding the configured path
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let options = Options::from_args();
    let config = match FlakemeterConfig::new(&options.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            exit(1);
        }
    };
    let result = match options.command {
        Command::Fetch => fetch(&config).await,
        Command::Analyze {
            reports_dir,
            output,
        } => analyze(&config, reports_dir, output),
    };
    if let Err(e) = result {
        error!("{}", e);
        exit(1);
    }
}

async fn fetch(config: &FlakemeterConfig) -> Result<(), Box<dyn Error>> {
    let token = config.token()?;
    let settings = config.fetch_settings()?;
    let github = DefaultGithubClient::new(&config.github.api_url, config.repository(), token)?;
    info!(
        "Fetching runs of workflow '{}' in {} within {}",
        settings.workflow_id,
        config.repository(),
        settings.window
    );
    let fetcher = ArtifactFetcher::new(github, settings);
    match fetcher.run().await {
        Ok(_) => {
            info!("All artifacts downloaded successfully");
            Ok(())
        }
        Err(e) if e.no_runs_found() => {
            info!("No runs found in the specified time range");
            exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn analyze(
    config: &FlakemeterConfig,
    reports_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let reports_dir = reports_dir.unwrap_or_else(|| config.analysis.reports_dir.clone());
    let output = output.unwrap_or_else(|| config.analysis.output.clone());
    let analyzer = ReportAnalyzer::new(
        config.aggregation_settings(),
        LinkAnnotator::new(config.link_settings()),
    );
    analyzer.run(&reports_dir, &output)?;
    Ok(())
}
