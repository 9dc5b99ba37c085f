use super::{Error, TestAggregate};
use csv::WriterBuilder;
use serde::Serializer;
use serde_derive::Serialize;
use std::fs;
use std::path::Path;

const COLUMNS: [&str; 9] = [
    "test_name",
    "test_class",
    "runs",
    "failures",
    "total_time",
    "failure_percentage",
    "flakey",
    "avg_time",
    "github_link",
];

/// A test's statistics along with the link to its source, if it could be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedAggregate {
    pub aggregate: TestAggregate,
    pub github_link: Option<String>,
}

#[derive(Serialize)]
struct Row<'a> {
    test_name: &'a str,
    test_class: &'a str,
    runs: u32,
    failures: u32,
    total_time: f64,
    failure_percentage: f64,
    #[serde(serialize_with = "capitalized_bool")]
    flakey: bool,
    avg_time: f64,
    github_link: Option<&'a str>,
}

impl<'a> From<&'a AnnotatedAggregate> for Row<'a> {
    fn from(annotated: &'a AnnotatedAggregate) -> Self {
        let aggregate = &annotated.aggregate;
        Self {
            test_name: &aggregate.test_name,
            test_class: &aggregate.test_class,
            runs: aggregate.runs,
            failures: aggregate.failures,
            total_time: aggregate.total_time,
            failure_percentage: aggregate.failure_percentage(),
            flakey: aggregate.flakey,
            avg_time: aggregate.average_time(),
            github_link: annotated.github_link.as_deref(),
        }
    }
}

/// Booleans are spelled `True`/`False`, as the CSVs consumed downstream always had them.
fn capitalized_bool<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

pub fn render_csv(rows: &[AnnotatedAggregate]) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buffer);
        writer.write_record(COLUMNS)?;
        for row in rows {
            writer.serialize(Row::from(row))?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }
    Ok(buffer)
}

/// Writes the whole table at once so a failure never leaves a partial file behind.
pub fn write_csv(path: &Path, rows: &[AnnotatedAggregate]) -> Result<(), Error> {
    let contents = render_csv(rows)?;
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn annotated(name: &str, runs: u32, failures: u32, link: Option<&str>) -> AnnotatedAggregate {
        AnnotatedAggregate {
            aggregate: TestAggregate {
                test_name: name.into(),
                test_class: "com.acme.foundation.CacheTest".into(),
                runs,
                failures,
                total_time: f64::from(runs) * 0.5,
                flakey: failures > 0,
            },
            github_link: link.map(String::from),
        }
    }

    #[test]
    fn header_only() {
        let contents = String::from_utf8(render_csv(&[]).unwrap()).unwrap();
        assert_eq!(
            contents,
            "test_name,test_class,runs,failures,total_time,failure_percentage,flakey,avg_time,github_link\n"
        );
    }

    #[test]
    fn rows() {
        let rows = vec![
            annotated("evicts", 4, 1, Some("https://github.com/acme/platform/tree/main/x.java")),
            annotated("loads, then caches", 2, 0, None),
        ];
        let contents = String::from_utf8(render_csv(&rows).unwrap()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "evicts,com.acme.foundation.CacheTest,4,1,2.0,25.0,True,0.5,https://github.com/acme/platform/tree/main/x.java"
        );
        assert_eq!(
            lines[2],
            "\"loads, then caches\",com.acme.foundation.CacheTest,2,0,1.0,0.0,False,0.5,"
        );
    }

    #[test]
    fn write_to_file() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("out.csv");
        write_csv(&path, &[annotated("evicts", 1, 0, None)]).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("test_name,"));
        assert!(contents.contains("evicts,"));
    }
}
