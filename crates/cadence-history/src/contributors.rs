//! First commit per author.
//!
//! Reduces a commit dataset to each author's earliest commit and persists it
//! as a CSV that [`crate::loader::load_first_commits`] reads back.

use std::collections::HashSet;
use std::path::Path;

use cadence_core::CadenceError;
use serde::Serialize;

use crate::loader::CommitRecord;

/// Date layout written to the first-commit CSV.
pub const FIRST_COMMIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Serialize)]
struct FirstCommitRow<'a> {
    author: &'a str,
    date: String,
    year: i32,
    month: u32,
}

/// Keep each author's earliest commit, ordered by date ascending.
///
/// Records are stable-sorted by date first, so when an author has two
/// commits with the same timestamp the one earlier in `records` wins.
///
/// # Examples
///
/// ```
/// use cadence_history::contributors::first_commits;
/// use cadence_history::loader::CommitRecord;
/// use chrono::{TimeZone, Utc};
///
/// let at = |d| Utc.with_ymd_and_hms(2021, 1, d, 0, 0, 0).unwrap();
/// let records = vec![
///     CommitRecord { author: "alice".into(), date: at(9) },
///     CommitRecord { author: "bob".into(), date: at(5) },
///     CommitRecord { author: "alice".into(), date: at(2) },
/// ];
/// let firsts = first_commits(&records);
/// assert_eq!(firsts.len(), 2);
/// assert_eq!(firsts[0].author, "alice");
/// assert_eq!(firsts[0].date, at(2));
/// ```
pub fn first_commits(records: &[CommitRecord]) -> Vec<CommitRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.date);

    let mut seen: HashSet<String> = HashSet::new();
    let mut firsts: Vec<CommitRecord> = sorted
        .into_iter()
        .filter(|r| seen.insert(r.author.clone()))
        .collect();
    firsts.sort_by_key(|r| r.date);
    firsts
}

/// Write first-commit records as `author,date,year,month`, replacing `path`.
///
/// Parent directories are created when missing.
///
/// # Errors
///
/// Returns [`CadenceError::Io`] or [`CadenceError::Csv`] if the file cannot
/// be written.
pub fn write_first_commits(path: &Path, records: &[CommitRecord]) -> Result<(), CadenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(FirstCommitRow {
            author: &record.author,
            date: record.date.format(FIRST_COMMIT_DATE_FORMAT).to_string(),
            year: record.year(),
            month: record.month(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Reduce `records` to first commits and persist them to `path`.
///
/// Always overwrites an existing file.
///
/// # Errors
///
/// Propagates errors from [`write_first_commits`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use cadence_history::contributors::extract_first_commits;
/// use cadence_history::loader::load_commits;
///
/// let commits = load_commits(Path::new("firefox_commits.csv")).unwrap();
/// let firsts = extract_first_commits(&commits, Path::new("firefox_first_commits.csv")).unwrap();
/// println!("{} distinct authors", firsts.len());
/// ```
pub fn extract_first_commits(
    records: &[CommitRecord],
    path: &Path,
) -> Result<Vec<CommitRecord>, CadenceError> {
    let firsts = first_commits(records);
    write_first_commits(path, &firsts)?;
    tracing::debug!(
        path = %path.display(),
        authors = firsts.len(),
        commits = records.len(),
        "wrote first commits"
    );
    Ok(firsts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_first_commits;
    use chrono::{TimeZone, Utc};

    fn commit(author: &str, month: u32, day: u32, hour: u32) -> CommitRecord {
        CommitRecord {
            author: author.into(),
            date: Utc.with_ymd_and_hms(2021, month, day, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn one_row_per_author_with_minimum_date() {
        let records = vec![
            commit("alice", 3, 1, 0),
            commit("bob", 2, 1, 0),
            commit("alice", 1, 1, 0),
            commit("carol", 6, 1, 0),
            commit("alice", 2, 15, 0),
            commit("bob", 1, 20, 0),
        ];
        let firsts = first_commits(&records);

        assert_eq!(firsts.len(), 3);
        for author in ["alice", "bob", "carol"] {
            let rows: Vec<_> = firsts.iter().filter(|r| r.author == author).collect();
            assert_eq!(rows.len(), 1, "{author} should appear once");
            let min = records
                .iter()
                .filter(|r| r.author == author)
                .map(|r| r.date)
                .min()
                .unwrap();
            assert_eq!(rows[0].date, min);
        }
    }

    #[test]
    fn output_is_sorted_by_date() {
        let records = vec![
            commit("dave", 12, 1, 0),
            commit("erin", 4, 1, 0),
            commit("frank", 8, 1, 0),
            commit("erin", 1, 1, 0),
        ];
        let firsts = first_commits(&records);
        assert!(firsts.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(firsts[0].author, "erin");
        assert_eq!(firsts[2].author, "dave");
    }

    #[test]
    fn simultaneous_authors_keep_input_order() {
        let records = vec![
            commit("yann", 1, 1, 0),
            commit("xena", 1, 1, 0),
            commit("yann", 1, 1, 0),
        ];
        let firsts = first_commits(&records);
        let authors: Vec<_> = firsts.iter().map(|r| r.author.as_str()).collect();
        assert_eq!(authors, vec!["yann", "xena"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(first_commits(&[]).is_empty());
    }

    #[test]
    fn written_file_round_trips_through_lenient_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/first.csv");
        let records = vec![commit("bob", 5, 5, 13), commit("alice", 1, 4, 8)];

        let firsts = extract_first_commits(&records, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("author,date,year,month\n"));
        assert!(content.contains("alice,2021-01-04 08:00:00+00:00,2021,1"));

        let reloaded = load_first_commits(&path).unwrap();
        assert_eq!(reloaded, firsts);
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("first.csv");
        std::fs::write(&path, "stale contents that are not csv rows\n").unwrap();

        extract_first_commits(&[commit("zoe", 7, 7, 7)], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 2);
    }
}
