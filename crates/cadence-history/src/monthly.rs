//! Monthly bucketing over a target year.
//!
//! Timestamps are counted per calendar month and every month of the year is
//! present in the result, zero when nothing fell into it. The same routine
//! serves commit counts and new-contributor counts; [`SeriesLabel`] carries
//! the wording that differs between them.

use std::fmt;

use chrono::{DateTime, Datelike, Month, Utc};
use serde::Serialize;

use crate::loader::CommitRecord;

/// Number of buckets in a monthly report.
pub const MONTHS: usize = 12;

/// Wording for one kind of monthly series.
///
/// # Examples
///
/// ```
/// use cadence_history::monthly::COMMITS;
///
/// assert_eq!(COMMITS.singular, "Commit");
/// assert_eq!(COMMITS.plural, "commits");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesLabel {
    /// Capitalised singular noun used in headings.
    pub singular: &'static str,
    /// Lower-case plural noun used in totals.
    pub plural: &'static str,
}

/// Label for commit counts.
pub const COMMITS: SeriesLabel = SeriesLabel {
    singular: "Commit",
    plural: "commits",
};

/// Label for first-commit (new contributor) counts.
pub const NEW_CONTRIBUTORS: SeriesLabel = SeriesLabel {
    singular: "New Contributor",
    plural: "new contributors",
};

/// Count of records in a single month.
///
/// # Examples
///
/// ```
/// use cadence_history::monthly::MonthCount;
///
/// let m = MonthCount { month: 2, name: "February".into(), count: 40 };
/// assert_eq!(m.abbreviation(), "Feb");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCount {
    /// Month number, 1 to 12.
    pub month: u32,
    /// Full English month name.
    pub name: String,
    /// Records dated in this month.
    pub count: u64,
}

impl MonthCount {
    /// Three-letter month abbreviation, as used on chart axes.
    pub fn abbreviation(&self) -> &str {
        self.name.get(..3).unwrap_or(&self.name)
    }
}

/// Dense monthly counts for one year plus their summary statistics.
///
/// # Examples
///
/// ```
/// use cadence_history::monthly::{MonthlyReport, COMMITS};
///
/// let mut counts = [0u64; 12];
/// counts[0] = 10;
/// counts[11] = 14;
/// let report = MonthlyReport::from_counts(COMMITS, 2021, counts);
/// assert_eq!(report.total, 24);
/// assert_eq!(report.average, 2.0);
/// assert_eq!(report.months.len(), 12);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    /// What was counted, e.g. `"commits"`.
    pub subject: String,
    /// Capitalised singular form of the subject, for headings.
    #[serde(skip)]
    pub heading: String,
    /// Calendar year the counts cover.
    pub year: i32,
    /// Exactly twelve entries, January first.
    pub months: Vec<MonthCount>,
    /// Sum of all monthly counts.
    pub total: u64,
    /// `total / 12`.
    pub average: f64,
}

impl MonthlyReport {
    /// Build a report from twelve already-bucketed counts.
    pub fn from_counts(label: SeriesLabel, year: i32, counts: [u64; MONTHS]) -> Self {
        let months = counts
            .iter()
            .enumerate()
            .map(|(idx, &count)| {
                let month = idx as u32 + 1;
                MonthCount {
                    month,
                    name: month_name(month).to_string(),
                    count,
                }
            })
            .collect();
        let total: u64 = counts.iter().sum();

        Self {
            subject: label.plural.to_string(),
            heading: label.singular.to_string(),
            year,
            months,
            total,
            average: total as f64 / MONTHS as f64,
        }
    }

    /// Counts in month order, January first.
    pub fn counts(&self) -> Vec<u64> {
        self.months.iter().map(|m| m.count).collect()
    }

    /// Render the report as Markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_history::monthly::{MonthlyReport, NEW_CONTRIBUTORS};
    ///
    /// let report = MonthlyReport::from_counts(NEW_CONTRIBUTORS, 2021, [1; 12]);
    /// let md = report.to_markdown();
    /// assert!(md.contains("# New Contributor Statistics for 2021"));
    /// assert!(md.contains("| December | 1 |"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# {} Statistics for {}\n\n",
            self.heading, self.year
        ));
        out.push_str(&format!(
            "**Total {}:** {}\n\n",
            self.subject,
            format_thousands(self.total)
        ));
        out.push_str(&format!("**Monthly average:** {:.1}\n\n", self.average));
        out.push_str("| Month | Count |\n");
        out.push_str("|-------|-------|\n");
        for m in &self.months {
            out.push_str(&format!("| {} | {} |\n", m.name, format_thousands(m.count)));
        }
        out
    }
}

impl fmt::Display for MonthlyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("{} Statistics for {}:", self.heading, self.year);
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "-".repeat(title.len().max(30)))?;
        writeln!(f, "Total {}: {}", self.subject, format_thousands(self.total))?;
        writeln!(f, "Monthly average: {:.1}", self.average)?;
        writeln!(f)?;
        writeln!(f, "{} by month:", capitalize(&self.subject))?;
        for m in &self.months {
            writeln!(f, "{:10} : {}", m.name, format_thousands(m.count))?;
        }
        Ok(())
    }
}

/// Count timestamps per month of `year`. Timestamps in other years are ignored.
///
/// # Examples
///
/// ```
/// use cadence_history::monthly::bucket_by_month;
/// use chrono::{TimeZone, Utc};
///
/// let dates = [
///     Utc.with_ymd_and_hms(2021, 1, 5, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2021, 1, 9, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2020, 1, 9, 0, 0, 0).unwrap(),
/// ];
/// let counts = bucket_by_month(dates, 2021);
/// assert_eq!(counts[0], 2);
/// assert_eq!(counts.iter().sum::<u64>(), 2);
/// ```
pub fn bucket_by_month<I>(dates: I, year: i32) -> [u64; MONTHS]
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts = [0u64; MONTHS];
    for date in dates {
        if date.year() == year {
            counts[date.month0() as usize] += 1;
        }
    }
    counts
}

/// Bucket commit dates for `year` into a labelled [`MonthlyReport`].
pub fn monthly_report(records: &[CommitRecord], year: i32, label: SeriesLabel) -> MonthlyReport {
    let counts = bucket_by_month(records.iter().map(|r| r.date), year);
    let report = MonthlyReport::from_counts(label, year, counts);
    tracing::debug!(
        subject = label.plural,
        year,
        total = report.total,
        "bucketed records by month"
    );
    report
}

/// Full English name for month `1..=12`; empty for anything else.
pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("", |m| m.name())
}

/// Format an integer with `,` thousands separators.
///
/// # Examples
///
/// ```
/// use cadence_history::monthly::format_thousands;
///
/// assert_eq!(format_thousands(0), "0");
/// assert_eq!(format_thousands(999), "999");
/// assert_eq!(format_thousands(1234567), "1,234,567");
/// ```
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
