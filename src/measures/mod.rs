//! SCM measures attached to analyzed resources
//!
//! Blame results are folded into three line-indexed measures (author, last
//! commit datetime, revision) plus a content hash. A [`MeasureUpdate`] tells the
//! persistence side whether to replace a resource's measures or carry the
//! previous ones forward.

mod store;

pub use store::{JsonMeasureStore, MeasureStore, MeasureStoreError};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::scm::BlameLine;

/// A fact that can be attached to a resource, identified by its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Metric {
    pub key: &'static str,
}

pub const SCM_AUTHORS_BY_LINE: Metric = Metric {
    key: "authors_by_line",
};

pub const SCM_LAST_COMMIT_DATETIMES_BY_LINE: Metric = Metric {
    key: "last_commit_datetimes_by_line",
};

pub const SCM_REVISIONS_BY_LINE: Metric = Metric {
    key: "revisions_by_line",
};

pub const SCM_HASH: Metric = Metric {
    key: "scm_hash",
};

/// Every metric written by a [`MeasureUpdate`]
pub const SCM_METRICS: [Metric; 4] = [
    SCM_AUTHORS_BY_LINE,
    SCM_LAST_COMMIT_DATETIMES_BY_LINE,
    SCM_REVISIONS_BY_LINE,
    SCM_HASH,
];

/// A stored measure value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub metric: String,
    pub data: String,
}

impl Measure {
    pub fn new(metric: Metric, data: impl Into<String>) -> Self {
        Self {
            metric: metric.key.to_string(),
            data: data.into(),
        }
    }
}

/// Format a commit datetime the way measures store it (`2010-05-18T15:50:45+0100`).
pub fn format_datetime(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

/// Encode a line-indexed mapping as `1=alice;2=bob`.
///
/// Backslashes, `=` and `;` inside values are escaped with a backslash.
pub fn key_value_data(values: &BTreeMap<u32, String>) -> String {
    values
        .iter()
        .map(|(line, value)| format!("{}={}", line, escape_value(value)))
        .collect::<Vec<_>>()
        .join(";")
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '=' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SHA-256 hex digest of a file's content.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Line-indexed SCM measures for one resource.
///
/// The three mappings always share the same key set `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSet {
    pub authors: BTreeMap<u32, String>,
    pub dates: BTreeMap<u32, String>,
    pub revisions: BTreeMap<u32, String>,
    pub hash: String,
}

impl MeasureSet {
    /// Number of attributed lines
    pub fn line_count(&self) -> usize {
        self.authors.len()
    }

    /// The four measures to persist for the resource
    pub fn to_measures(&self) -> [Measure; 4] {
        [
            Measure::new(SCM_AUTHORS_BY_LINE, key_value_data(&self.authors)),
            Measure::new(SCM_LAST_COMMIT_DATETIMES_BY_LINE, key_value_data(&self.dates)),
            Measure::new(SCM_REVISIONS_BY_LINE, key_value_data(&self.revisions)),
            Measure::new(SCM_HASH, self.hash.clone()),
        ]
    }
}

/// Accumulates the per-line values of one line-indexed metric.
#[derive(Debug, Clone)]
pub struct LineMeasureBuilder {
    metric: Metric,
    values: BTreeMap<u32, String>,
}

impl LineMeasureBuilder {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            values: BTreeMap::new(),
        }
    }

    /// Set the value for `line`, replacing any earlier one
    pub fn add(&mut self, line: u32, value: impl Into<String>) -> &mut Self {
        self.values.insert(line, value.into());
        self
    }

    pub fn values(&self) -> &BTreeMap<u32, String> {
        &self.values
    }

    /// The encoded measure (`1=alice;2=bob`)
    pub fn build(&self) -> Measure {
        Measure::new(self.metric, key_value_data(&self.values))
    }

    pub fn into_values(self) -> BTreeMap<u32, String> {
        self.values
    }
}

/// Folds blame lines into a [`MeasureSet`], numbering lines from 1.
#[derive(Debug)]
pub struct MeasureSetBuilder {
    authors: LineMeasureBuilder,
    dates: LineMeasureBuilder,
    revisions: LineMeasureBuilder,
    next_line: u32,
}

impl MeasureSetBuilder {
    pub fn new() -> Self {
        Self {
            authors: LineMeasureBuilder::new(SCM_AUTHORS_BY_LINE),
            dates: LineMeasureBuilder::new(SCM_LAST_COMMIT_DATETIMES_BY_LINE),
            revisions: LineMeasureBuilder::new(SCM_REVISIONS_BY_LINE),
            next_line: 1,
        }
    }

    pub fn push(&mut self, line: &BlameLine) -> &mut Self {
        let number = self.next_line;
        self.authors.add(number, line.author.as_str());
        self.dates.add(number, format_datetime(&line.date));
        self.revisions.add(number, line.revision.as_str());
        self.next_line += 1;
        self
    }

    pub fn build(self, hash: impl Into<String>) -> MeasureSet {
        MeasureSet {
            authors: self.authors.into_values(),
            dates: self.dates.into_values(),
            revisions: self.revisions.into_values(),
            hash: hash.into(),
        }
    }
}

impl Default for MeasureSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with a resource's SCM measures after a blame attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasureUpdate {
    /// Blame was unavailable; keep whatever was recorded before
    CopyPreviousMeasures { resource: String },
    /// Replace the resource's measures
    SaveNewMeasures { resource: String, measures: MeasureSet },
}

impl MeasureUpdate {
    pub fn resource(&self) -> &str {
        match self {
            MeasureUpdate::CopyPreviousMeasures { resource } => resource,
            MeasureUpdate::SaveNewMeasures { resource, .. } => resource,
        }
    }

    pub fn measures(&self) -> Option<&MeasureSet> {
        match self {
            MeasureUpdate::CopyPreviousMeasures { .. } => None,
            MeasureUpdate::SaveNewMeasures { measures, .. } => Some(measures),
        }
    }

    /// Write this update to a measure store.
    pub fn apply<S: MeasureStore + ?Sized>(&self, store: &mut S) {
        match self {
            MeasureUpdate::CopyPreviousMeasures { resource } => {
                for metric in SCM_METRICS {
                    if let Some(previous) = store.previous(resource, metric) {
                        store.save(resource, previous);
                    }
                }
            }
            MeasureUpdate::SaveNewMeasures { resource, measures } => {
                for measure in measures.to_measures() {
                    store.save(resource, measure);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn line(author: &str, revision: &str) -> BlameLine {
        let date = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2010, 5, 18, 15, 50, 45)
            .unwrap();
        BlameLine::new(author, date, revision)
    }

    #[derive(Default)]
    struct MapStore {
        previous: HashMap<(String, String), Measure>,
        saved: Vec<(String, Measure)>,
    }

    impl MeasureStore for MapStore {
        fn previous(&self, resource: &str, metric: Metric) -> Option<Measure> {
            self.previous
                .get(&(resource.to_string(), metric.key.to_string()))
                .cloned()
        }

        fn save(&mut self, resource: &str, measure: Measure) {
            self.saved.push((resource.to_string(), measure));
        }
    }

    #[test]
    fn test_builder_numbers_lines_from_one() {
        let mut builder = MeasureSetBuilder::new();
        builder
            .push(&line("alice", "1.1"))
            .push(&line("bob", "1.2"))
            .push(&line("alice", "1.3"));
        let set = builder.build("abc");

        assert_eq!(set.line_count(), 3);
        assert_eq!(set.authors.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(set.authors[&2], "bob");
        assert_eq!(set.revisions[&3], "1.3");
        assert_eq!(set.dates[&1], "2010-05-18T15:50:45+0100");
        assert_eq!(set.hash, "abc");
    }

    #[test]
    fn test_key_value_data() {
        let mut builder = MeasureSetBuilder::new();
        builder.push(&line("alice", "1.1")).push(&line("bob", "1.2"));
        let measures = builder.build("h").to_measures();

        assert_eq!(measures[0].metric, "authors_by_line");
        assert_eq!(measures[0].data, "1=alice;2=bob");
        assert_eq!(measures[2].data, "1=1.1;2=1.2");
        assert_eq!(measures[3], Measure::new(SCM_HASH, "h"));
    }

    #[test]
    fn test_line_measure_builder() {
        let mut authors = LineMeasureBuilder::new(SCM_AUTHORS_BY_LINE);
        authors.add(3, "alice").add(1, "bob").add(2, "carol");
        authors.add(2, "dave");

        assert_eq!(authors.values().len(), 3);
        assert_eq!(
            authors.build(),
            Measure::new(SCM_AUTHORS_BY_LINE, "1=bob;2=dave;3=alice")
        );
    }

    #[test]
    fn test_key_value_data_escapes_separators() {
        let mut builder = MeasureSetBuilder::new();
        builder
            .push(&line("a=b;c", "r1"))
            .push(&line("back\\slash", "r2"));
        let measures = builder.build("h").to_measures();

        assert_eq!(measures[0].data, "1=a\\=b\\;c;2=back\\\\slash");
        assert_eq!(measures[2].data, "1=r1;2=r2");
    }

    #[test]
    fn test_empty_file_builds_empty_mappings() {
        let set = MeasureSetBuilder::new().build("h");
        assert_eq!(set.line_count(), 0);
        assert!(set.dates.is_empty());
        assert_eq!(set.to_measures()[0].data, "");
    }

    #[test]
    fn test_save_new_measures_writes_all_metrics() {
        let mut builder = MeasureSetBuilder::new();
        builder.push(&line("alice", "1.1"));
        let update = MeasureUpdate::SaveNewMeasures {
            resource: "src/Foo.java".to_string(),
            measures: builder.build("h"),
        };

        let mut store = MapStore::default();
        update.apply(&mut store);
        assert_eq!(store.saved.len(), 4);
        assert!(store.saved.iter().all(|(r, _)| r == "src/Foo.java"));
    }

    #[test]
    fn test_copy_previous_only_carries_existing_measures() {
        let mut store = MapStore::default();
        store.previous.insert(
            ("Foo.java".to_string(), "authors_by_line".to_string()),
            Measure::new(SCM_AUTHORS_BY_LINE, "1=alice"),
        );

        let update = MeasureUpdate::CopyPreviousMeasures {
            resource: "Foo.java".to_string(),
        };
        update.apply(&mut store);

        assert_eq!(store.saved.len(), 1);
        assert_eq!(store.saved[0].1.data, "1=alice");
        assert!(update.measures().is_none());
    }

    #[test]
    fn test_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello\n").unwrap();
        assert_eq!(
            content_hash(&path).unwrap(),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }
}
