//! Weekly code-review transaction activity.
//!
//! Revisions exported from the review system each carry a list of
//! transactions (comments, status changes, ...). Transactions are flattened,
//! counted per week ending Sunday, and smoothed with a centered rolling mean.

use std::collections::BTreeMap;
use std::path::Path;

use cadence_core::{CadenceError, ReviewConfig, ReviewTimezone};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// A revision as exported by the review system. Only transactions are kept.
///
/// # Examples
///
/// ```
/// use cadence_history::reviews::Revision;
///
/// let json = r#"{"id": 7, "transactions": [{"dateCreated": 1609459200, "type": "comment"}]}"#;
/// let revision: Revision = serde_json::from_str(json).unwrap();
/// assert_eq!(revision.transactions.unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Revision {
    /// Events attached to the revision, if the export included them.
    #[serde(default)]
    pub transactions: Option<Vec<RevisionTransaction>>,
}

/// A raw transaction inside a [`Revision`].
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionTransaction {
    /// Creation time in Unix epoch seconds.
    #[serde(rename = "dateCreated")]
    pub date_created: i64,
    /// Transaction type label, e.g. `"comment"` or `"accept"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A flattened transaction with a wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Creation time in the configured timezone.
    pub date: NaiveDateTime,
    /// Transaction type label.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One weekly window of activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCount {
    /// The Sunday that closes the window (Monday through Sunday inclusive).
    pub week_ending: NaiveDate,
    /// Transactions created during the window.
    pub count: u64,
    /// Centered rolling mean, `None` where the window runs off the series.
    pub smoothed: Option<f64>,
}

/// Weekly transaction counts for one year.
///
/// # Examples
///
/// ```
/// use cadence_history::reviews::WeeklyReport;
///
/// let report = WeeklyReport { year: 2021, window: 4, weeks: vec![] };
/// assert_eq!(report.total(), 0);
/// assert!(report.smoothed_points().is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    /// Calendar year of the week-ending labels.
    pub year: i32,
    /// Rolling mean width.
    pub window: usize,
    /// Dense, chronologically ordered weeks.
    pub weeks: Vec<WeekCount>,
}

impl WeeklyReport {
    /// Transactions across all weeks in the report.
    pub fn total(&self) -> u64 {
        self.weeks.iter().map(|w| w.count).sum()
    }

    /// `(week_ending, smoothed)` for weeks that have a smoothed value.
    pub fn smoothed_points(&self) -> Vec<(NaiveDate, f64)> {
        self.weeks
            .iter()
            .filter_map(|w| w.smoothed.map(|s| (w.week_ending, s)))
            .collect()
    }

    /// Render the weekly series as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Code Review Transactions per Week ({})\n\n",
            self.year
        ));
        out.push_str(&format!(
            "**Total transactions:** {}\n\n",
            crate::monthly::format_thousands(self.total())
        ));
        out.push_str(&format!(
            "| Week ending | Count | {}-week mean |\n",
            self.window
        ));
        out.push_str("|-------------|-------|-------------|\n");
        for w in &self.weeks {
            let smoothed = w.smoothed.map(|s| format!("{s:.2}")).unwrap_or_default();
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                w.week_ending, w.count, smoothed
            ));
        }
        out
    }
}

/// Load a revisions JSON file.
///
/// Returns `Ok(None)` when the file does not exist so callers can skip the
/// analysis.
///
/// # Errors
///
/// Returns [`CadenceError::Io`] if the file cannot be read and
/// [`CadenceError::Serialization`] if it is not a JSON array of revisions.
pub fn load_revisions(path: &Path) -> Result<Option<Vec<Revision>>, CadenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let revisions: Vec<Revision> = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), revisions = revisions.len(), "loaded revisions");
    Ok(Some(revisions))
}

/// Flatten every revision's transactions into one sequence.
///
/// Revisions without a `transactions` array contribute nothing.
///
/// # Errors
///
/// Returns [`CadenceError::Parse`] if an epoch value is out of range.
///
/// # Examples
///
/// ```
/// use cadence_core::ReviewTimezone;
/// use cadence_history::reviews::{flatten_transactions, Revision};
///
/// let revisions: Vec<Revision> = serde_json::from_str(
///     r#"[{"transactions": [{"dateCreated": 0, "type": "create"}]}, {}]"#,
/// ).unwrap();
/// let txns = flatten_transactions(&revisions, ReviewTimezone::Utc).unwrap();
/// assert_eq!(txns.len(), 1);
/// assert_eq!(txns[0].date.to_string(), "1970-01-01 00:00:00");
/// ```
pub fn flatten_transactions(
    revisions: &[Revision],
    timezone: ReviewTimezone,
) -> Result<Vec<Transaction>, CadenceError> {
    let mut transactions = Vec::new();
    for revision in revisions {
        let Some(txns) = &revision.transactions else {
            continue;
        };
        for txn in txns {
            transactions.push(Transaction {
                date: epoch_to_wall_clock(txn.date_created, timezone)?,
                kind: txn.kind.clone(),
            });
        }
    }
    Ok(transactions)
}

/// Convert epoch seconds to a wall-clock timestamp in `timezone`.
///
/// # Errors
///
/// Returns [`CadenceError::Parse`] if `secs` is outside chrono's range.
pub fn epoch_to_wall_clock(
    secs: i64,
    timezone: ReviewTimezone,
) -> Result<NaiveDateTime, CadenceError> {
    let converted = match timezone {
        ReviewTimezone::Utc => DateTime::from_timestamp(secs, 0).map(|d| d.naive_utc()),
        ReviewTimezone::Local => Local
            .timestamp_opt(secs, 0)
            .earliest()
            .map(|d| d.naive_local()),
    };
    converted.ok_or_else(|| CadenceError::Parse(format!("epoch {secs} is out of range")))
}

/// The Sunday closing the Monday to Sunday week that contains `date`.
///
/// # Examples
///
/// ```
/// use cadence_history::reviews::week_ending;
/// use chrono::NaiveDate;
///
/// let wednesday = NaiveDate::from_ymd_opt(2021, 1, 20).unwrap();
/// let sunday = NaiveDate::from_ymd_opt(2021, 1, 24).unwrap();
/// assert_eq!(week_ending(wednesday), sunday);
/// assert_eq!(week_ending(sunday), sunday);
/// ```
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
    date.checked_add_days(Days::new(days_to_sunday))
        .unwrap_or(date)
}

/// Count transactions per week, zero-filling every week between the first
/// and last observed week.
///
/// Returns `(week_ending, count)` pairs in chronological order.
pub fn weekly_counts(transactions: &[Transaction]) -> Vec<(NaiveDate, u64)> {
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for txn in transactions {
        *buckets.entry(week_ending(txn.date.date())).or_default() += 1;
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut weeks = Vec::new();
    let mut week = first;
    while week <= last {
        weeks.push((week, buckets.get(&week).copied().unwrap_or(0)));
        match week.checked_add_days(Days::new(7)) {
            Some(next) => week = next,
            None => break,
        }
    }
    weeks
}

/// Centered rolling mean with a fixed window and no partial windows.
///
/// Position `i` averages `values[i + (w-1)/2 + 1 - w ..= i + (w-1)/2]`; for
/// `w = 4` that is `i-2 ..= i+1`. Positions whose window leaves the series
/// are `None`. A window of 0 yields all `None`.
///
/// # Examples
///
/// ```
/// use cadence_history::reviews::centered_rolling_mean;
///
/// let smoothed = centered_rolling_mean(&[4, 8, 12, 16, 20], 4);
/// assert_eq!(smoothed, vec![None, None, Some(10.0), Some(14.0), None]);
/// ```
pub fn centered_rolling_mean(values: &[u64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let ahead = (window - 1) / 2;
    let behind = window - 1 - ahead;

    (0..values.len())
        .map(|i| {
            if i < behind || i + ahead >= values.len() {
                return None;
            }
            let slice = &values[i - behind..=i + ahead];
            Some(slice.iter().sum::<u64>() as f64 / window as f64)
        })
        .collect()
}

/// Bucket transactions by week, keep weeks ending in `year`, and smooth.
///
/// The rolling mean is taken after the year filter, so the first and last
/// weeks of the year have no smoothed value.
pub fn weekly_report(transactions: &[Transaction], year: i32, window: usize) -> WeeklyReport {
    let in_year: Vec<(NaiveDate, u64)> = weekly_counts(transactions)
        .into_iter()
        .filter(|(week, _)| week.year() == year)
        .collect();
    let counts: Vec<u64> = in_year.iter().map(|(_, c)| *c).collect();
    let smoothed = centered_rolling_mean(&counts, window);

    let weeks = in_year
        .into_iter()
        .zip(smoothed)
        .map(|((week_ending, count), smoothed)| WeekCount {
            week_ending,
            count,
            smoothed,
        })
        .collect();

    WeeklyReport {
        year,
        window,
        weeks,
    }
}

/// Load, flatten, and summarise review activity for `year`.
///
/// Returns `Ok(None)` and logs a warning when `path` does not exist.
///
/// # Errors
///
/// Propagates read, JSON, and epoch conversion errors.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use cadence_core::ReviewConfig;
/// use cadence_history::reviews::analyze_reviews;
///
/// let path = Path::new("phab_firefox_revisions_2021.json");
/// if let Some(report) = analyze_reviews(path, 2021, &ReviewConfig::default()).unwrap() {
///     println!("{} transactions", report.total());
/// }
/// ```
pub fn analyze_reviews(
    path: &Path,
    year: i32,
    config: &ReviewConfig,
) -> Result<Option<WeeklyReport>, CadenceError> {
    let Some(revisions) = load_revisions(path)? else {
        tracing::warn!(path = %path.display(), "review data not found, skipping review analysis");
        return Ok(None);
    };

    let mut transactions = flatten_transactions(&revisions, config.timezone)?;
    transactions.sort_by_key(|t| t.date);
    tracing::debug!(transactions = transactions.len(), "flattened review transactions");

    Ok(Some(weekly_report(
        &transactions,
        year,
        config.smoothing_window,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn_on(y: i32, m: u32, d: u32) -> Transaction {
        Transaction {
            date: date(y, m, d).and_hms_opt(15, 0, 0).unwrap(),
            kind: Some("comment".into()),
        }
    }

    fn utc_config() -> ReviewConfig {
        ReviewConfig {
            timezone: ReviewTimezone::Utc,
            ..ReviewConfig::default()
        }
    }

    #[test]
    fn flattening_skips_revisions_without_transactions() {
        let json = r#"[
            {"id": 1, "transactions": [
                {"dateCreated": 1609459200, "type": "create"},
                {"dateCreated": 1609545600, "type": "comment"},
                {"dateCreated": 1610000000, "type": "accept"}
            ]},
            {"id": 2, "transactions": []}
        ]"#;
        let revisions: Vec<Revision> = serde_json::from_str(json).unwrap();
        let txns = flatten_transactions(&revisions, ReviewTimezone::Utc).unwrap();

        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].date, date(2021, 1, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(txns[0].kind.as_deref(), Some("create"));
        assert_eq!(txns[1].date, date(2021, 1, 2).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(txns[1].kind.as_deref(), Some("comment"));
        assert_eq!(
            txns[2].date,
            date(2021, 1, 7).and_hms_opt(6, 13, 20).unwrap()
        );
        assert_eq!(txns[2].kind.as_deref(), Some("accept"));
    }

    #[test]
    fn missing_transactions_key_and_null_type_are_tolerated() {
        let json = r#"[{"id": 1}, {"transactions": [{"dateCreated": 0, "type": null}]}]"#;
        let revisions: Vec<Revision> = serde_json::from_str(json).unwrap();
        let txns = flatten_transactions(&revisions, ReviewTimezone::Utc).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].kind, None);
    }

    #[test]
    fn local_conversion_matches_chrono_local() {
        let secs = 1_620_000_000;
        let expected = Local.timestamp_opt(secs, 0).unwrap().naive_local();
        assert_eq!(
            epoch_to_wall_clock(secs, ReviewTimezone::Local).unwrap(),
            expected
        );
    }

    #[test]
    fn out_of_range_epoch_is_an_error() {
        let err = epoch_to_wall_clock(i64::MAX, ReviewTimezone::Utc).unwrap_err();
        assert!(matches!(err, CadenceError::Parse(_)));
    }

    #[test]
    fn weeks_end_on_sunday() {
        assert_eq!(week_ending(date(2021, 1, 4)), date(2021, 1, 10));
        assert_eq!(week_ending(date(2021, 1, 10)), date(2021, 1, 10));
        assert_eq!(week_ending(date(2020, 12, 31)), date(2021, 1, 3));
        assert_eq!(week_ending(date(2021, 12, 31)), date(2022, 1, 2));
    }

    #[test]
    fn empty_weeks_are_zero_filled() {
        let txns = vec![txn_on(2021, 1, 4), txn_on(2021, 1, 5), txn_on(2021, 1, 27)];
        let weeks = weekly_counts(&txns);
        assert_eq!(
            weeks,
            vec![
                (date(2021, 1, 10), 2),
                (date(2021, 1, 17), 0),
                (date(2021, 1, 24), 0),
                (date(2021, 1, 31), 1),
            ]
        );
    }

    #[test]
    fn sunday_afternoon_belongs_to_that_sunday() {
        let weeks = weekly_counts(&[txn_on(2021, 1, 17)]);
        assert_eq!(weeks, vec![(date(2021, 1, 17), 1)]);
    }

    #[test]
    fn no_transactions_gives_no_weeks() {
        assert!(weekly_counts(&[]).is_empty());
    }

    #[test]
    fn rolling_mean_edges_are_undefined() {
        let values: Vec<u64> = (1..=8).collect();
        let smoothed = centered_rolling_mean(&values, 4);
        assert_eq!(smoothed.len(), 8);
        assert_eq!(smoothed[0], None);
        assert_eq!(smoothed[1], None);
        assert_eq!(smoothed[7], None);
        assert_eq!(smoothed[2], Some((1 + 2 + 3 + 4) as f64 / 4.0));
        assert_eq!(smoothed[6], Some((5 + 6 + 7 + 8) as f64 / 4.0));
        assert_eq!(smoothed.iter().filter(|s| s.is_some()).count(), 5);
    }

    #[test]
    fn rolling_mean_shorter_than_window_is_all_undefined() {
        assert_eq!(centered_rolling_mean(&[1, 2, 3], 4), vec![None, None, None]);
        assert!(centered_rolling_mean(&[], 4).is_empty());
    }

    #[test]
    fn rolling_mean_odd_window_is_symmetric() {
        let smoothed = centered_rolling_mean(&[3, 6, 9, 12], 3);
        assert_eq!(smoothed, vec![None, Some(6.0), Some(9.0), None]);
    }

    #[test]
    fn rolling_mean_window_of_one_is_identity() {
        let smoothed = centered_rolling_mean(&[5, 0, 2], 1);
        assert_eq!(smoothed, vec![Some(5.0), Some(0.0), Some(2.0)]);
    }

    #[test]
    fn report_keeps_only_weeks_ending_in_year() {
        let txns = vec![
            txn_on(2020, 12, 28),
            txn_on(2020, 12, 31),
            txn_on(2021, 1, 4),
            txn_on(2021, 12, 30),
        ];
        let report = weekly_report(&txns, 2021, 4);
        assert_eq!(report.weeks.first().unwrap().week_ending, date(2021, 1, 3));
        assert_eq!(report.weeks.first().unwrap().count, 2);
        assert_eq!(report.weeks.last().unwrap().week_ending, date(2021, 12, 26));
        assert_eq!(report.weeks.len(), 52);
        assert_eq!(report.total(), 3);
        assert!(report.weeks.iter().all(|w| w.week_ending.year() == 2021));
    }

    #[test]
    fn report_smoothing_is_applied_after_year_filter() {
        let mut txns = Vec::new();
        for day in [4, 11, 18, 25] {
            for _ in 0..day {
                txns.push(txn_on(2021, 1, day));
            }
        }
        let report = weekly_report(&txns, 2021, 4);
        let counts: Vec<u64> = report.weeks.iter().map(|w| w.count).collect();
        assert_eq!(counts, vec![4, 11, 18, 25]);
        let smoothed: Vec<Option<f64>> = report.weeks.iter().map(|w| w.smoothed).collect();
        assert_eq!(smoothed, vec![None, None, Some(14.5), None]);
        assert_eq!(report.smoothed_points(), vec![(date(2021, 1, 24), 14.5)]);
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phab_2021.json");
        let result = analyze_reviews(&path, 2021, &utc_config()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phab_2021.json");
        std::fs::write(&path, "[{\"transactions\": [").unwrap();
        let err = analyze_reviews(&path, 2021, &utc_config()).unwrap_err();
        assert!(matches!(err, CadenceError::Serialization(_)));
    }

    #[test]
    fn analyze_reviews_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phab_2021.json");
        // 2021-01-12 twice, 2021-01-04 and 2021-01-20, all at noon UTC
        std::fs::write(
            &path,
            r#"[
                {"transactions": [
                    {"dateCreated": 1610452800, "type": "comment"},
                    {"dateCreated": 1609761600, "type": "create"}
                ]},
                {"transactions": [
                    {"dateCreated": 1610452800, "type": "accept"},
                    {"dateCreated": 1611144000, "type": "close"}
                ]}
            ]"#,
        )
        .unwrap();

        let report = analyze_reviews(&path, 2021, &utc_config()).unwrap().unwrap();
        let counts: Vec<(NaiveDate, u64)> = report
            .weeks
            .iter()
            .map(|w| (w.week_ending, w.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                (date(2021, 1, 10), 1),
                (date(2021, 1, 17), 2),
                (date(2021, 1, 24), 1),
            ]
        );
        assert_eq!(report.window, 4);
        assert!(report.smoothed_points().is_empty());
    }

    #[test]
    fn markdown_leaves_undefined_smoothing_blank() {
        let report = WeeklyReport {
            year: 2021,
            window: 4,
            weeks: vec![WeekCount {
                week_ending: date(2021, 1, 10),
                count: 3,
                smoothed: None,
            }],
        };
        let md = report.to_markdown();
        assert!(md.contains("| 2021-01-10 | 3 |  |"));
        assert!(md.contains("**Total transactions:** 3"));
    }
}
