use super::{Error, ParseError};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use regex::bytes::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// The outcome of a single test case execution within one report.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseRecord {
    pub name: String,
    pub classname: String,
    /// Seconds.
    pub duration: f64,
    pub failed: bool,
    pub errored: bool,
}

impl TestCaseRecord {
    pub fn is_failure(&self) -> bool {
        self.failed || self.errored
    }
}

/// Parses a report, returning one record per `testcase` element directly under the root.
/// Nested test cases are not looked at.
pub fn parse_report(source: &str) -> Result<Vec<TestCaseRecord>, ParseError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let document = Document::parse_with_options(source, options)?;
    document
        .root_element()
        .children()
        .filter(|node| node.has_tag_name("testcase"))
        .map(parse_test_case)
        .collect()
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?-u:\xEF\xBB\xBF)?\s*<\?xml\s[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
            .expect("declaration pattern is valid")
    })
}

/// Decodes a report using the encoding named in its XML declaration, UTF-8 if there is none. A
/// byte order mark takes precedence over the declaration.
pub fn decode_report(bytes: &[u8]) -> Result<Cow<str>, ParseError> {
    let encoding = match declaration_pattern().captures(bytes) {
        Some(captures) => Encoding::for_label(&captures[1]).ok_or_else(|| {
            ParseError::UnsupportedEncoding(String::from_utf8_lossy(&captures[1]).into_owned())
        })?,
        None => UTF_8,
    };
    let (source, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ParseError::InvalidEncoding(used.name()));
    }
    Ok(source)
}

fn parse_test_case(node: Node) -> Result<TestCaseRecord, ParseError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let classname = node.attribute("classname").unwrap_or_default().to_string();
    let duration = match node.attribute("time") {
        Some(value) => parse_duration(value).ok_or_else(|| ParseError::InvalidDuration {
            test: name.clone(),
            value: value.to_string(),
        })?,
        None => 0.0,
    };
    Ok(TestCaseRecord {
        failed: has_child(node, "failure"),
        errored: has_child(node, "error"),
        name,
        classname,
        duration,
    })
}

fn parse_duration(value: &str) -> Option<f64> {
    let duration: f64 = value.trim().parse().ok()?;
    if duration.is_finite() && duration >= 0.0 {
        Some(duration)
    } else {
        None
    }
}

fn has_child(node: Node, tag: &str) -> bool {
    node.children().any(|child| child.has_tag_name(tag))
}

/// Recursively parses every `.xml` file under `root`, returning the records of each one.
pub fn collect_reports(root: &Path) -> Result<Vec<Vec<TestCaseRecord>>, Error> {
    let mut reports = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "xml") {
            continue;
        }
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let records = decode_report(&bytes)
            .and_then(|source| parse_report(&source))
            .map_err(|source| Error::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Parsed {} test cases from {}", records.len(), path.display());
        reports.push(records);
    }
    Ok(reports)
}
