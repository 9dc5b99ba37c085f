pub mod aggregate;
pub mod analyzer;
pub mod error;
pub mod links;
pub mod output;
pub mod parser;

pub use aggregate::{aggregate, AggregationSettings, GroupingKey, TestAggregate};
pub use analyzer::{AnalysisSummary, ReportAnalyzer};
pub use error::{Error, ParseError};
pub use links::{LinkAnnotator, LinkSettings};
pub use output::{render_csv, write_csv, AnnotatedAggregate};
pub use parser::{collect_reports, decode_report, parse_report, TestCaseRecord};
