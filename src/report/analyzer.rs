use super::output::{write_csv, AnnotatedAggregate};
use super::{aggregate, collect_reports, AggregationSettings, Error, LinkAnnotator};
use log::info;
use std::path::Path;

#[derive(Debug, Default, PartialEq, Clone)]
pub struct AnalysisSummary {
    pub reports: usize,
    pub tests: usize,
    pub flaky: usize,
}

/// Turns a directory of test reports into a table of per test flakiness statistics.
pub struct ReportAnalyzer {
    settings: AggregationSettings,
    annotator: LinkAnnotator,
}

impl ReportAnalyzer {
    pub fn new(settings: AggregationSettings, annotator: LinkAnnotator) -> Self {
        Self {
            settings,
            annotator,
        }
    }

    pub fn analyze(&self, reports_dir: &Path) -> Result<(usize, Vec<AnnotatedAggregate>), Error> {
        let reports = collect_reports(reports_dir)?;
        info!(
            "Parsed {} reports from {}",
            reports.len(),
            reports_dir.display()
        );
        let aggregates = aggregate(reports.iter().flatten(), &self.settings);
        let annotated = aggregates
            .into_iter()
            .map(|aggregate| {
                let github_link = self.annotator.link_for(&aggregate.test_class)?;
                Ok(AnnotatedAggregate {
                    aggregate,
                    github_link,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok((reports.len(), annotated))
    }

    pub fn run(&self, reports_dir: &Path, output: &Path) -> Result<AnalysisSummary, Error> {
        let (reports, rows) = self.analyze(reports_dir)?;
        write_csv(output, &rows)?;
        let summary = AnalysisSummary {
            reports,
            tests: rows.len(),
            flaky: rows.iter().filter(|row| row.aggregate.flakey).count(),
        };
        info!(
            "Wrote {} tests ({} flaky) to {}",
            summary.tests,
            summary.flaky,
            output.display()
        );
        Ok(summary)
    }
}
