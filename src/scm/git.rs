//! Git provider backed by libgit2
//!
//! Blame is computed for the working-tree content of the file, on top of `HEAD`
//! of the repository containing the request's file set root. Lines not yet
//! committed are attributed to [`NOT_COMMITTED_AUTHOR`] with the zero revision.
//! Hunks are expanded so every source line gets its own entry.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use git2::{BlameOptions, ErrorCode, Oid, Repository};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    BlameLine, BlameOutcome, BlameRequest, ProviderRepository, ProviderSettings, ScmError,
    ScmProvider, ScmRepository, ScmResult,
};

/// Author reported for lines that differ from `HEAD`
pub const NOT_COMMITTED_AUTHOR: &str = "Not Committed Yet";

/// Git implementation of [`ScmProvider`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GitScmProvider;

impl GitScmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ScmProvider for GitScmProvider {
    fn make_provider_repository(&self, provider_specific: &str) -> ScmResult<ProviderRepository> {
        let location = provider_specific.trim();
        if location.is_empty() {
            return Err(ScmError::invalid_url(
                provider_specific,
                vec!["The git repository location is empty.".to_string()],
            ));
        }
        Ok(ProviderRepository::new(location))
    }

    fn blame(
        &self,
        _repository: &ScmRepository,
        request: &BlameRequest,
        _settings: &ProviderSettings,
    ) -> ScmResult<BlameOutcome> {
        let repo = Repository::discover(&request.file_set_root)?;
        let relative = path_in_workdir(&repo, &request.path())?;
        let content = fs::read(request.path())?;
        let output = format!("git blame {}", relative.display());

        let mut opts = BlameOptions::new();
        opts.ignore_whitespace(request.ignore_whitespace);

        let committed = match repo.blame_file(&relative, Some(&mut opts)) {
            Ok(blame) => blame,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Ok(BlameOutcome::failure(
                    format!("{} is not under version control", relative.display()),
                    e.message(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        // Attribute the working-tree content so local edits get their own lines
        let blame = committed.blame_buffer(&content)?;

        let mut commit_times: HashMap<Oid, DateTime<FixedOffset>> = HashMap::new();
        let uncommitted_date = Utc::now().fixed_offset();
        let mut lines = Vec::new();

        for hunk in blame.iter() {
            let commit_id = hunk.final_commit_id();
            let (author, date) = if commit_id.is_zero() {
                (NOT_COMMITTED_AUTHOR.to_string(), uncommitted_date)
            } else {
                let sig = hunk.final_signature();
                let author = sig.name().unwrap_or("Unknown").to_string();

                // Last commit time, falling back to the author time for unknown commits
                let date = *commit_times.entry(commit_id).or_insert_with(|| {
                    let time = repo
                        .find_commit(commit_id)
                        .map(|c| c.time())
                        .unwrap_or_else(|_| sig.when());
                    to_datetime(&time)
                });
                (author, date)
            };

            let revision = commit_id.to_string();
            for _ in 0..hunk.lines_in_hunk() {
                lines.push(BlameLine::new(author.clone(), date, revision.clone()));
            }
        }

        let expected = line_count(&content);
        if lines.len() != expected {
            return Ok(BlameOutcome::failure(
                format!(
                    "blame attributed {} of {} lines of {}",
                    lines.len(),
                    expected,
                    relative.display()
                ),
                output,
            ));
        }

        debug!(
            "Blamed {} lines of {} ({} commits)",
            lines.len(),
            relative.display(),
            commit_times.len()
        );
        Ok(BlameOutcome::success(lines, output))
    }
}

/// Number of lines in `content`, counting a final line without a newline.
fn line_count(content: &[u8]) -> usize {
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    match content.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Resolve `path` relative to the work tree of `repo`.
fn path_in_workdir(repo: &Repository, path: &Path) -> ScmResult<PathBuf> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| ScmError::Provider("Bare repositories have no work tree to blame".to_string()))?;
    let workdir = workdir.canonicalize()?;
    let path = path.canonicalize()?;

    path.strip_prefix(&workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            ScmError::Provider(format!(
                "{} is outside the work tree {}",
                path.display(),
                workdir.display()
            ))
        })
}

/// Convert a git timestamp, keeping its original offset.
fn to_datetime(time: &git2::Time) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|offset| offset.timestamp_opt(time.seconds(), 0).single())
        .unwrap_or_else(|| DateTime::<Utc>::default().fixed_offset())
}
