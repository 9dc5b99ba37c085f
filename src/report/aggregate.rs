use super::TestCaseRecord;
use serde_derive::Deserialize;
use std::collections::BTreeMap;

/// How records from different reports are considered to belong to the same test.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKey {
    /// Test name only. Same-named tests of different classes are merged, and the class reported
    /// is the last one seen.
    #[default]
    Name,

    /// Class and test name.
    ClassAndName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    pub group_by: GroupingKey,
    /// Tests failing strictly more than this percentage of their runs are flaky.
    pub flaky_threshold: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            group_by: GroupingKey::Name,
            flaky_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestAggregate {
    pub test_name: String,
    pub test_class: String,
    pub runs: u32,
    pub failures: u32,
    pub total_time: f64,
    pub flakey: bool,
}

impl TestAggregate {
    pub fn failure_percentage(&self) -> f64 {
        100.0 * f64::from(self.failures) / f64::from(self.runs)
    }

    pub fn average_time(&self) -> f64 {
        self.total_time / f64::from(self.runs)
    }
}

#[derive(Default)]
struct Accumulator {
    test_class: String,
    runs: u32,
    failures: u32,
    total_time: f64,
}

impl Accumulator {
    fn add(&mut self, record: &TestCaseRecord) {
        self.test_class.clone_from(&record.classname);
        self.runs += 1;
        self.total_time += record.duration;
        if record.is_failure() {
            self.failures += 1;
        }
    }
}

/// Groups records into per test statistics, sorted by test name and then class.
pub fn aggregate<'a, I>(records: I, settings: &AggregationSettings) -> Vec<TestAggregate>
where
    I: IntoIterator<Item = &'a TestCaseRecord>,
{
    let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();
    for record in records {
        let key = match settings.group_by {
            GroupingKey::Name => (record.name.clone(), String::new()),
            GroupingKey::ClassAndName => (record.name.clone(), record.classname.clone()),
        };
        groups.entry(key).or_default().add(record);
    }
    groups
        .into_iter()
        .map(|((test_name, _), group)| {
            let mut aggregate = TestAggregate {
                test_name,
                test_class: group.test_class,
                runs: group.runs,
                failures: group.failures,
                total_time: group.total_time,
                flakey: false,
            };
            aggregate.flakey = aggregate.failure_percentage() > settings.flaky_threshold;
            aggregate
        })
        .collect()
}
