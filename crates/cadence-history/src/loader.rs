//! Commit CSV loading.
//!
//! Two parsers read the same logical `date` column: a strict one for the raw
//! git export and a lenient ISO-style one for the first-commit file this crate
//! writes itself.

use std::io::Read;
use std::path::Path;

use cadence_core::CadenceError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout of the raw commit CSV (git's default `%ad` output).
pub const COMMIT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

/// A single commit: who made it and when.
///
/// # Examples
///
/// ```
/// use cadence_history::loader::CommitRecord;
/// use chrono::{TimeZone, Utc};
///
/// let record = CommitRecord {
///     author: "alice".into(),
///     date: Utc.with_ymd_and_hms(2021, 3, 15, 9, 30, 0).unwrap(),
/// };
/// assert_eq!(record.year(), 2021);
/// assert_eq!(record.month(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Author name as recorded by version control.
    pub author: String,
    /// Commit timestamp normalised to UTC.
    pub date: DateTime<Utc>,
}

impl CommitRecord {
    /// Calendar year of the commit (UTC).
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Calendar month of the commit, 1 to 12 (UTC).
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

#[derive(Debug, Deserialize)]
struct RawCommitRow {
    author: String,
    date: String,
}

type DateParser = fn(&str) -> Result<DateTime<Utc>, CadenceError>;

/// Load the raw commit CSV, parsing dates with [`COMMIT_DATE_FORMAT`].
///
/// Extra columns are ignored. Rows keep their file order.
///
/// # Errors
///
/// Returns [`CadenceError::FileNotFound`] if `path` does not exist,
/// [`CadenceError::Csv`] if the file lacks an `author` or `date` column, and
/// [`CadenceError::Parse`] on the first date that does not match the format.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use cadence_history::loader::load_commits;
///
/// let commits = load_commits(Path::new("firefox_commits.csv")).unwrap();
/// println!("{} commits", commits.len());
/// ```
pub fn load_commits(path: &Path) -> Result<Vec<CommitRecord>, CadenceError> {
    load_with(path, parse_commit_date)
}

/// Load a first-commit CSV, parsing dates with [`parse_iso_date`].
///
/// # Errors
///
/// Same as [`load_commits`].
pub fn load_first_commits(path: &Path) -> Result<Vec<CommitRecord>, CadenceError> {
    load_with(path, parse_iso_date)
}

/// Read commit rows from any CSV source using the strict date format.
///
/// `source` names the input in error messages.
///
/// # Errors
///
/// Returns [`CadenceError::Csv`] or [`CadenceError::Parse`] as [`load_commits`] does.
///
/// # Examples
///
/// ```
/// use cadence_history::loader::read_commits;
///
/// let csv = "author,date\nalice,Mon Jan 04 09:15:00 2021 +0100\n";
/// let commits = read_commits(csv.as_bytes(), "inline").unwrap();
/// assert_eq!(commits[0].author, "alice");
/// assert_eq!(commits[0].date.to_rfc3339(), "2021-01-04T08:15:00+00:00");
/// ```
pub fn read_commits<R: Read>(reader: R, source: &str) -> Result<Vec<CommitRecord>, CadenceError> {
    read_with(reader, source, parse_commit_date)
}

/// Read commit rows from any CSV source using the lenient ISO parser.
///
/// # Errors
///
/// Same as [`read_commits`].
pub fn read_first_commits<R: Read>(
    reader: R,
    source: &str,
) -> Result<Vec<CommitRecord>, CadenceError> {
    read_with(reader, source, parse_iso_date)
}

fn load_with(path: &Path, parse: DateParser) -> Result<Vec<CommitRecord>, CadenceError> {
    if !path.exists() {
        return Err(CadenceError::FileNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let records = read_with(file, &path.display().to_string(), parse)?;
    tracing::debug!(path = %path.display(), rows = records.len(), "loaded commit records");
    Ok(records)
}

fn read_with<R: Read>(
    reader: R,
    source: &str,
    parse: DateParser,
) -> Result<Vec<CommitRecord>, CadenceError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (idx, row) in csv_reader.deserialize::<RawCommitRow>().enumerate() {
        let row = row?;
        let date = parse(&row.date).map_err(|e| {
            CadenceError::Parse(format!("{source}: row {}: {e}", idx + 1))
        })?;
        records.push(CommitRecord {
            author: row.author,
            date,
        });
    }

    Ok(records)
}

/// Parse a timestamp in [`COMMIT_DATE_FORMAT`] and convert it to UTC.
///
/// # Errors
///
/// Returns [`CadenceError::Parse`] if `value` does not match exactly.
///
/// # Examples
///
/// ```
/// use cadence_history::loader::parse_commit_date;
///
/// let date = parse_commit_date("Fri Dec 31 23:30:00 2021 -0200").unwrap();
/// assert_eq!(date.to_rfc3339(), "2022-01-01T01:30:00+00:00");
/// assert!(parse_commit_date("2021-12-31").is_err());
/// ```
pub fn parse_commit_date(value: &str) -> Result<DateTime<Utc>, CadenceError> {
    DateTime::parse_from_str(value.trim(), COMMIT_DATE_FORMAT)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            CadenceError::Parse(format!(
                "date '{value}' does not match '{COMMIT_DATE_FORMAT}': {e}"
            ))
        })
}

/// Parse an ISO-style timestamp, accepting the common variants.
///
/// Accepted, in order: RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]±HH:MM` (or `±HHMM`),
/// naive date-times with a space or `T` separator (taken as UTC), and bare
/// `YYYY-MM-DD` dates (midnight UTC).
///
/// # Errors
///
/// Returns [`CadenceError::Parse`] if no variant matches.
///
/// # Examples
///
/// ```
/// use cadence_history::loader::parse_iso_date;
///
/// let a = parse_iso_date("2021-01-04 08:15:00+00:00").unwrap();
/// let b = parse_iso_date("2021-01-04T09:15:00+01:00").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_iso_date(value: &str) -> Result<DateTime<Utc>, CadenceError> {
    let value = value.trim();

    if let Ok(d) = DateTime::parse_from_rfc3339(value) {
        return Ok(d.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(d) = DateTime::parse_from_str(value, format) {
            return Ok(d.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(CadenceError::Parse(format!(
        "date '{value}' is not an ISO-8601 timestamp"
    )))
}
