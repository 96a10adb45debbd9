//! Per-file blame retrieval and measure construction

use std::path::Path;
use tracing::{debug, warn};

use super::{RepositoryResolver, ResolveError};
use crate::measures::{MeasureSetBuilder, MeasureUpdate};
use crate::scm::{BlameOutcome, BlameRequest};

/// Retrieves blame for analyzed files and turns it into measures.
#[derive(Debug)]
pub struct Blame {
    resolver: RepositoryResolver,
}

impl Blame {
    pub fn new(resolver: RepositoryResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RepositoryResolver {
        &self.resolver
    }

    /// Build the measure update for `resource` from the blame of `file`.
    ///
    /// When blame is unavailable the update preserves the previous measures
    /// instead of clearing them.
    pub fn build_measures(
        &self,
        file: &Path,
        resource: &str,
        content_hash: &str,
    ) -> Result<MeasureUpdate, ResolveError> {
        let Some(outcome) = self.retrieve(file)? else {
            return Ok(MeasureUpdate::CopyPreviousMeasures {
                resource: resource.to_string(),
            });
        };

        let mut builder = MeasureSetBuilder::new();
        for line in &outcome.lines {
            builder.push(line);
        }

        Ok(MeasureUpdate::SaveNewMeasures {
            resource: resource.to_string(),
            measures: builder.build(content_hash),
        })
    }

    /// Run blame for `file`.
    ///
    /// Returns `Ok(None)` when the provider could not attribute the file
    /// (untracked or generated source, provider or transport errors). Only a
    /// failure to resolve the repository is returned as an error.
    pub fn retrieve(&self, file: &Path) -> Result<Option<BlameOutcome>, ResolveError> {
        let repository = self.resolver.resolve()?;

        let Some(filename) = file.file_name() else {
            warn!("Fail to retrieve SCM info of: {}. Reason: not a file", file.display());
            return Ok(None);
        };
        let file_set_root = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let request = BlameRequest::new(repository, file_set_root)
            .with_filename(filename.to_string_lossy())
            .with_ignore_whitespace(true);
        debug!(
            "Blame {} in {} (ignore whitespace: {})",
            request.filename,
            request.file_set_root.display(),
            request.ignore_whitespace
        );

        match self.resolver.client().blame(&request) {
            Ok(outcome) if outcome.is_success() => Ok(Some(outcome)),
            Ok(outcome) => {
                warn!(
                    "Fail to retrieve SCM info of: {}. Reason: {}\n{}",
                    file.display(),
                    outcome.provider_message.as_deref().unwrap_or("unknown"),
                    outcome.command_output
                );
                Ok(None)
            }
            Err(e) => {
                // Can happen on generated sources
                warn!("Fail to retrieve SCM info of: {}: {}", file.display(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::mock::MockScmClient;
    use crate::config::ScmConfiguration;
    use crate::scm::{BlameLine, ScmError};
    use chrono::{FixedOffset, TimeZone};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn blame_with(client: MockScmClient) -> (Arc<MockScmClient>, Blame) {
        let client = Arc::new(client);
        let resolver = RepositoryResolver::new(client.clone(), ScmConfiguration::new("scm:git:/repo"));
        (client, Blame::new(resolver))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber that records formatted events
    fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        (result, logs)
    }

    fn line(author: &str, revision: &str, day: u32) -> BlameLine {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2011, 1, day, 10, 0, 0)
            .unwrap();
        BlameLine::new(author, date, revision)
    }

    #[test]
    fn test_builds_measures_for_three_lines() {
        let (_, blame) = blame_with(MockScmClient::new().with_blame(|_| {
            Ok(BlameOutcome::success(
                vec![line("alice", "1.1", 1), line("bob", "1.2", 2), line("alice", "1.3", 3)],
                "",
            ))
        }));

        let update = blame
            .build_measures(Path::new("src/Foo.java"), "src/Foo.java", "sha")
            .unwrap();
        let MeasureUpdate::SaveNewMeasures { resource, measures } = update else {
            panic!("expected new measures");
        };

        assert_eq!(resource, "src/Foo.java");
        let authors: Vec<(u32, &str)> = measures.authors.iter().map(|(k, v)| (*k, v.as_str())).collect();
        assert_eq!(authors, vec![(1, "alice"), (2, "bob"), (3, "alice")]);
        let revisions: Vec<&str> = measures.revisions.values().map(String::as_str).collect();
        assert_eq!(revisions, vec!["1.1", "1.2", "1.3"]);
        assert_eq!(measures.dates[&2], "2011-01-02T10:00:00+0000");
        assert_eq!(measures.hash, "sha");
    }

    #[test]
    fn test_mappings_share_key_set() {
        let lines: Vec<BlameLine> = (1..=25).map(|i| line("dev", &format!("r{i}"), 1)).collect();
        let (_, blame) = blame_with(
            MockScmClient::new().with_blame(move |_| Ok(BlameOutcome::success(lines.clone(), ""))),
        );

        let update = blame.build_measures(Path::new("a/b.rs"), "b.rs", "h").unwrap();
        let measures = update.measures().unwrap();
        let keys: Vec<u32> = measures.authors.keys().copied().collect();
        assert_eq!(keys, (1..=25).collect::<Vec<_>>());
        assert!(measures.dates.keys().eq(measures.authors.keys()));
        assert!(measures.revisions.keys().eq(measures.authors.keys()));
    }

    #[test]
    fn test_request_scoped_to_parent_directory() {
        let (client, blame) = blame_with(MockScmClient::new());

        blame.retrieve(Path::new("src/main/java/Foo.java")).unwrap();
        let request = client.last_request().unwrap();
        assert_eq!(request.file_set_root, PathBuf::from("src/main/java"));
        assert_eq!(request.filename, "Foo.java");
        assert!(request.ignore_whitespace);
        assert_eq!(request.repository.url, "scm:git:/repo");
    }

    #[test]
    fn test_bare_filename_uses_current_directory() {
        let (client, blame) = blame_with(MockScmClient::new());

        blame.retrieve(Path::new("Foo.java")).unwrap();
        assert_eq!(client.last_request().unwrap().file_set_root, PathBuf::from("."));
    }

    #[test]
    fn test_provider_failure_preserves_previous_measures() {
        let (_, blame) = blame_with(
            MockScmClient::new()
                .with_blame(|_| Ok(BlameOutcome::failure("not under version control", "output"))),
        );

        assert!(blame.retrieve(Path::new("Generated.java")).unwrap().is_none());
        let update = blame
            .build_measures(Path::new("Generated.java"), "Generated.java", "h")
            .unwrap();
        assert_eq!(
            update,
            MeasureUpdate::CopyPreviousMeasures {
                resource: "Generated.java".to_string()
            }
        );
    }

    #[test]
    fn test_transport_error_preserves_previous_measures() {
        let (_, blame) = blame_with(
            MockScmClient::new().with_blame(|_| Err(ScmError::Provider("connection reset".to_string()))),
        );

        let update = blame.build_measures(Path::new("Foo.java"), "Foo.java", "h").unwrap();
        assert!(matches!(update, MeasureUpdate::CopyPreviousMeasures { .. }));
    }

    #[test]
    fn test_provider_failure_logs_warning() {
        let (_, blame) = blame_with(MockScmClient::new().with_blame(|_| {
            Ok(BlameOutcome::failure("not under version control", "svn: E155007"))
        }));

        let (update, logs) = capture_logs(|| {
            blame.build_measures(Path::new("gen/Generated.java"), "Generated.java", "h")
        });
        assert!(matches!(update, Ok(MeasureUpdate::CopyPreviousMeasures { .. })));
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(logs.contains("Fail to retrieve SCM info of: gen/Generated.java"));
        assert!(logs.contains("not under version control"));
        assert!(logs.contains("svn: E155007"));
    }

    #[test]
    fn test_transport_error_logs_warning() {
        let (_, blame) = blame_with(
            MockScmClient::new().with_blame(|_| Err(ScmError::Provider("connection reset".to_string()))),
        );

        let (update, logs) =
            capture_logs(|| blame.build_measures(Path::new("Foo.java"), "Foo.java", "h"));
        assert!(matches!(update, Ok(MeasureUpdate::CopyPreviousMeasures { .. })));
        assert!(logs.contains("Fail to retrieve SCM info of: Foo.java"), "logs: {logs}");
        assert!(logs.contains("connection reset"));
    }

    #[test]
    fn test_successful_blame_logs_no_warning() {
        let (_, blame) = blame_with(MockScmClient::new());

        let (update, logs) =
            capture_logs(|| blame.build_measures(Path::new("Foo.java"), "Foo.java", "h"));
        assert!(update.unwrap().measures().is_some());
        assert!(!logs.contains("Fail to retrieve SCM info"), "logs: {logs}");
    }

    #[test]
    fn test_resolution_failure_is_fatal() {
        let (client, blame) = blame_with(MockScmClient::new().with_make(|url, _| {
            Err(ScmError::Repository {
                url: url.to_string(),
                validation_messages: vec!["invalid url".to_string()],
            })
        }));

        let err = blame.build_measures(Path::new("Foo.java"), "Foo.java", "h").unwrap_err();
        assert!(err.is_configuration());
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_repository_resolved_once_across_files() {
        let (client, blame) = blame_with(MockScmClient::new());

        for name in ["a.rs", "b.rs", "c.rs"] {
            blame.build_measures(Path::new(name), name, "h").unwrap();
        }
        assert_eq!(client.make_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(client.requests.lock().unwrap().len(), 3);
    }
}
