//! Commit export via git2.
//!
//! Walks a repository's history and writes the `author,date` CSV that
//! [`crate::loader::load_commits`] reads, using git's default date layout and
//! each commit's own author offset.

use std::path::Path;

use cadence_core::CadenceError;
use chrono::{DateTime, FixedOffset};
use git2::{Repository, Sort};
use serde::Serialize;

use crate::loader::COMMIT_DATE_FORMAT;

/// Author and author date of one commit.
///
/// # Examples
///
/// ```
/// use cadence_history::mining::MinedCommit;
/// use chrono::DateTime;
///
/// let commit = MinedCommit {
///     author: "alice".into(),
///     date: DateTime::parse_from_rfc3339("2021-01-04T09:15:00+01:00").unwrap(),
/// };
/// assert_eq!(commit.formatted_date(), "Mon Jan 04 09:15:00 2021 +0100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedCommit {
    /// Author name.
    pub author: String,
    /// Author timestamp in the author's recorded offset.
    pub date: DateTime<FixedOffset>,
}

impl MinedCommit {
    /// The date rendered in [`COMMIT_DATE_FORMAT`].
    pub fn formatted_date(&self) -> String {
        self.date.format(COMMIT_DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Serialize)]
struct CommitRow<'a> {
    author: &'a str,
    date: String,
}

/// Options for history export.
///
/// # Examples
///
/// ```
/// use cadence_history::mining::ExportOptions;
///
/// let opts = ExportOptions::default();
/// assert!(opts.branch.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
}

/// Collect author and author date for every commit reachable from HEAD or
/// the configured branch, newest first.
///
/// # Errors
///
/// Returns [`CadenceError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use cadence_history::mining::{mine_commits, ExportOptions};
///
/// let commits = mine_commits(Path::new("."), &ExportOptions::default()).unwrap();
/// for c in commits.iter().take(3) {
///     println!("{} {}", c.formatted_date(), c.author);
/// }
/// ```
pub fn mine_commits(
    repo_path: &Path,
    options: &ExportOptions,
) -> Result<Vec<MinedCommit>, CadenceError> {
    let repo = Repository::open(repo_path)
        .map_err(|e| CadenceError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| CadenceError::Git(format!("failed to create revwalk: {e}")))?;

    revwalk
        .set_sorting(Sort::TIME)
        .map_err(|e| CadenceError::Git(format!("failed to set sorting: {e}")))?;

    if let Some(ref branch) = options.branch {
        let reference = repo
            .resolve_reference_from_short_name(branch)
            .map_err(|e| CadenceError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
        let oid = reference
            .target()
            .ok_or_else(|| CadenceError::Git("branch has no target".into()))?;
        revwalk
            .push(oid)
            .map_err(|e| CadenceError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| CadenceError::Git(format!("failed to push HEAD: {e}")))?;
    }

    let mut commits = Vec::new();
    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| CadenceError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| CadenceError::Git(format!("failed to find commit: {e}")))?;

        let author = commit.author();
        let when = author.when();
        let date = to_fixed_offset(when.seconds(), when.offset_minutes()).ok_or_else(|| {
            CadenceError::Git(format!("commit {oid} has an invalid author timestamp"))
        })?;

        commits.push(MinedCommit {
            author: author.name().unwrap_or("unknown").to_string(),
            date,
        });
    }

    tracing::debug!(repo = %repo_path.display(), commits = commits.len(), "mined commits");
    Ok(commits)
}

fn to_fixed_offset(seconds: i64, offset_minutes: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(offset_minutes.checked_mul(60)?)?;
    DateTime::from_timestamp(seconds, 0).map(|utc| utc.with_timezone(&offset))
}

/// Write mined commits as an `author,date` CSV, replacing `path`.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`CadenceError::Io`] or [`CadenceError::Csv`] on write failure.
pub fn write_commits_csv(path: &Path, commits: &[MinedCommit]) -> Result<usize, CadenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(["author", "date"])?;
    for commit in commits {
        writer.serialize(CommitRow {
            author: &commit.author,
            date: commit.formatted_date(),
        })?;
    }
    writer.flush()?;
    Ok(commits.len())
}

/// Mine `repo_path` and write the commit CSV to `output`.
///
/// # Errors
///
/// Propagates errors from [`mine_commits`] and [`write_commits_csv`].
pub fn export_commits(
    repo_path: &Path,
    output: &Path,
    options: &ExportOptions,
) -> Result<usize, CadenceError> {
    let commits = mine_commits(repo_path, options)?;
    write_commits_csv(output, &commits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_commits;
    use chrono::{TimeZone, Utc};
    use git2::{Signature, Time};

    fn commit_at(repo: &Repository, name: &str, seconds: i64, offset_minutes: i32) {
        let email = format!("{name}@example.com");
        let sig = Signature::new(name, &email, &Time::new(seconds, offset_minutes)).unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| repo.find_commit(oid).unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parents)
            .unwrap();
    }

    fn sample_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        // 2021-01-04 08:15:00 UTC authored at +01:00
        commit_at(&repo, "alice", 1_609_748_100, 60);
        // 2021-03-15 12:00:00 UTC authored at -05:00
        commit_at(&repo, "bob", 1_615_809_600, -300);
        dir
    }

    #[test]
    fn export_options_default_to_head() {
        assert!(ExportOptions::default().branch.is_none());
    }

    #[test]
    fn mined_commits_are_newest_first_with_author_offset() {
        let dir = sample_repo();
        let commits = mine_commits(dir.path(), &ExportOptions::default()).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author, "bob");
        assert_eq!(commits[0].formatted_date(), "Mon Mar 15 07:00:00 2021 -0500");
        assert_eq!(commits[1].author, "alice");
        assert_eq!(commits[1].formatted_date(), "Mon Jan 04 09:15:00 2021 +0100");
    }

    #[test]
    fn exported_csv_loads_with_strict_parser() {
        let dir = sample_repo();
        let output = dir.path().join("out/commits.csv");
        let written = export_commits(dir.path(), &output, &ExportOptions::default()).unwrap();
        assert_eq!(written, 2);

        let records = load_commits(&output).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].date,
            Utc.with_ymd_and_hms(2021, 1, 4, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn unknown_branch_is_a_git_error() {
        let dir = sample_repo();
        let opts = ExportOptions {
            branch: Some("does-not-exist".into()),
        };
        let err = mine_commits(dir.path(), &opts).unwrap_err();
        assert!(matches!(err, CadenceError::Git(_)));
    }

    #[test]
    fn non_repository_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = mine_commits(dir.path(), &ExportOptions::default()).unwrap_err();
        assert!(err.to_string().contains("failed to open repository"));
    }
}
