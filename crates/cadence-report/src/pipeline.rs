//! The four analysis routines and their printable outcomes.
//!
//! Every routine takes the resolved [`CadenceConfig`], writes its chart when
//! charts are enabled, and returns the computed statistics. Rendering is left
//! to the caller through each outcome's `render`.

use std::path::{Path, PathBuf};

use cadence_core::{CadenceConfig, CadenceError, OutputFormat};
use cadence_history::contributors::extract_first_commits;
use cadence_history::loader::{load_commits, load_first_commits, CommitRecord};
use cadence_history::monthly::{monthly_report, MonthlyReport};
use cadence_history::reviews::{analyze_reviews, WeeklyReport};
use serde::Serialize;

use crate::charts::{
    render_monthly_chart, render_weekly_chart, SeriesSpec, COMMIT_SERIES, NEW_CONTRIBUTOR_SERIES,
};

/// A monthly report plus the chart written for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyOutcome {
    /// Twelve zero-filled monthly buckets.
    pub report: MonthlyReport,
    /// SVG path, when charts are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
}

impl MonthlyOutcome {
    /// Render as a statistics table, Markdown, or JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Serialization`] if JSON encoding fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, CadenceError> {
        Ok(match format {
            OutputFormat::Text => format!("{}{}", self.report, chart_line(self.chart.as_deref())),
            OutputFormat::Markdown => self.report.to_markdown(),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

/// Where the first-commit dataset was written and how many authors it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstCommitOutcome {
    /// Path of the persisted CSV.
    pub path: PathBuf,
    /// Distinct authors written.
    pub authors: usize,
    /// Commits the reduction started from.
    pub commits: usize,
}

impl FirstCommitOutcome {
    /// Render the save confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Serialization`] if JSON encoding fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::OutputFormat;
    /// use cadence_report::pipeline::FirstCommitOutcome;
    ///
    /// let outcome = FirstCommitOutcome { path: "first.csv".into(), authors: 3, commits: 9 };
    /// let text = outcome.render(OutputFormat::Text).unwrap();
    /// assert_eq!(text, "Saved first commits dataset to 'first.csv'\n");
    /// ```
    pub fn render(&self, format: OutputFormat) -> Result<String, CadenceError> {
        Ok(match format {
            OutputFormat::Text => {
                format!("Saved first commits dataset to '{}'\n", self.path.display())
            }
            OutputFormat::Markdown => format!(
                "Saved first commits of **{}** authors ({} commits) to `{}`\n",
                self.authors,
                self.commits,
                self.path.display()
            ),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

/// New-contributor statistics, with the first-commit dataset they came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContributorOutcome {
    /// First-commit records as re-loaded from disk.
    #[serde(skip)]
    pub dataset: Vec<CommitRecord>,
    /// Monthly first-commit buckets.
    pub report: MonthlyReport,
    /// SVG path, when charts are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
}

impl NewContributorOutcome {
    /// Render like [`MonthlyOutcome::render`].
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Serialization`] if JSON encoding fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, CadenceError> {
        Ok(match format {
            OutputFormat::Text => format!("{}{}", self.report, chart_line(self.chart.as_deref())),
            OutputFormat::Markdown => self.report.to_markdown(),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

/// Smoothed weekly review activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Weekly counts and rolling means.
    pub report: WeeklyReport,
    /// SVG path, when charts are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
}

impl ReviewOutcome {
    /// Text mode prints only the chart location; the series itself is
    /// available as Markdown or JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Serialization`] if JSON encoding fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, CadenceError> {
        Ok(match format {
            OutputFormat::Text => chart_line(self.chart.as_deref()),
            OutputFormat::Markdown => self.report.to_markdown(),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

/// Everything the full sequence produced, for single-document JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub commits: MonthlyOutcome,
    pub first_commits: FirstCommitOutcome,
    pub new_contributors: NewContributorOutcome,
    pub reviews: Option<ReviewOutcome>,
}

impl RunOutcome {
    /// Render every section in sequence order. JSON emits one document.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Serialization`] if JSON encoding fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, CadenceError> {
        if format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(self)?);
        }
        let mut sections = vec![
            self.commits.render(format)?,
            self.first_commits.render(format)?,
            self.new_contributors.render(format)?,
        ];
        if let Some(reviews) = &self.reviews {
            sections.push(reviews.render(format)?);
        }
        Ok(sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn chart_line(chart: Option<&Path>) -> String {
    chart
        .map(|p| format!("Chart saved to '{}'\n", p.display()))
        .unwrap_or_default()
}

/// Bucket `records` by month for the configured year and chart them with
/// `spec`'s styling.
///
/// # Errors
///
/// Returns chart errors from [`render_monthly_chart`].
pub fn analyze_monthly(
    records: &[CommitRecord],
    spec: &SeriesSpec,
    config: &CadenceConfig,
) -> Result<MonthlyOutcome, CadenceError> {
    let report = monthly_report(records, config.dataset.year, spec.label);
    let chart = if config.charts.enabled {
        Some(render_monthly_chart(&report, spec, &config.charts)?)
    } else {
        None
    };
    Ok(MonthlyOutcome { report, chart })
}

/// Monthly commit frequency for the configured year.
///
/// # Errors
///
/// Returns chart errors from [`analyze_monthly`].
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceConfig;
/// use cadence_history::loader::CommitRecord;
/// use cadence_report::pipeline::monthly_commits;
/// use chrono::{TimeZone, Utc};
///
/// let mut config = CadenceConfig::default();
/// config.charts.enabled = false;
/// let records = vec![CommitRecord {
///     author: "alice".into(),
///     date: Utc.with_ymd_and_hms(2021, 2, 3, 4, 5, 6).unwrap(),
/// }];
/// let outcome = monthly_commits(&records, &config).unwrap();
/// assert_eq!(outcome.report.months[1].count, 1);
/// assert!(outcome.chart.is_none());
/// ```
pub fn monthly_commits(
    records: &[CommitRecord],
    config: &CadenceConfig,
) -> Result<MonthlyOutcome, CadenceError> {
    analyze_monthly(records, &COMMIT_SERIES, config)
}

/// Reduce `records` to first commits and persist them to the configured path.
///
/// # Errors
///
/// Propagates write errors from
/// [`extract_first_commits`](cadence_history::contributors::extract_first_commits).
pub fn create_first_commits(
    records: &[CommitRecord],
    config: &CadenceConfig,
) -> Result<FirstCommitOutcome, CadenceError> {
    let path = config.dataset.first_commits.clone();
    let firsts = extract_first_commits(records, &path)?;
    Ok(FirstCommitOutcome {
        path,
        authors: firsts.len(),
        commits: records.len(),
    })
}

/// Re-load the persisted first-commit dataset and chart new contributors per
/// month.
///
/// # Errors
///
/// Returns [`CadenceError::FileNotFound`] if the dataset has not been created
/// yet, plus parse and chart errors.
pub fn analyze_new_contributors(
    config: &CadenceConfig,
) -> Result<NewContributorOutcome, CadenceError> {
    let dataset = load_first_commits(&config.dataset.first_commits)?;
    let MonthlyOutcome { report, chart } =
        analyze_monthly(&dataset, &NEW_CONTRIBUTOR_SERIES, config)?;
    Ok(NewContributorOutcome {
        dataset,
        report,
        chart,
    })
}

/// Weekly review activity for the configured year.
///
/// Returns `Ok(None)` when the year's review file is absent.
///
/// # Errors
///
/// Propagates JSON, epoch conversion, and chart errors.
pub fn analyze_review_activity(
    config: &CadenceConfig,
) -> Result<Option<ReviewOutcome>, CadenceError> {
    let path = config.dataset.reviews_path();
    let Some(report) = analyze_reviews(&path, config.dataset.year, &config.reviews)? else {
        return Ok(None);
    };
    let chart = if config.charts.enabled {
        Some(render_weekly_chart(&report, &config.charts)?)
    } else {
        None
    };
    Ok(Some(ReviewOutcome { report, chart }))
}

/// Run the full sequence: monthly commits, first-commit extraction, new
/// contributors, and review activity.
///
/// `progress` is called with a one-line description before each step.
///
/// # Errors
///
/// Stops at the first failing step.
pub fn run_all(
    config: &CadenceConfig,
    mut progress: impl FnMut(&str),
) -> Result<RunOutcome, CadenceError> {
    let year = config.dataset.year;

    progress(&format!("1. Analyzing monthly commits for {year}..."));
    let records = load_commits(&config.dataset.commits)?;
    let commits = monthly_commits(&records, config)?;

    progress("2. Creating first commits dataset...");
    let first_commits = create_first_commits(&records, config)?;

    progress(&format!("3. Analyzing monthly new contributors for {year}..."));
    let new_contributors = analyze_new_contributors(config)?;

    progress(&format!("4. Analyzing weekly review activity for {year}..."));
    let reviews = analyze_review_activity(config)?;

    Ok(RunOutcome {
        commits,
        first_commits,
        new_contributors,
        reviews,
    })
}
