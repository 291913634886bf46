use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".cadence.toml";

/// Top-level configuration loaded from `.cadence.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceConfig;
///
/// let config = CadenceConfig::default();
/// assert_eq!(config.dataset.year, 2021);
/// assert_eq!(config.reviews.smoothing_window, 4);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Input and intermediate file locations plus the target year.
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Chart output settings.
    #[serde(default)]
    pub charts: ChartConfig,
    /// Review-transaction analysis settings.
    #[serde(default)]
    pub reviews: ReviewConfig,
}

impl CadenceConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Io`] if the file cannot be read,
    /// [`CadenceError::Toml`] if the content is not valid TOML, or
    /// [`CadenceError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cadence_core::CadenceConfig;
    /// use std::path::Path;
    ///
    /// let config = CadenceConfig::from_file(Path::new(".cadence.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CadenceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Toml`] if parsing fails and
    /// [`CadenceError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_core::CadenceConfig;
    ///
    /// let toml = r#"
    /// [dataset]
    /// year = 2022
    /// "#;
    /// let config = CadenceConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.dataset.year, 2022);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CadenceError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that TOML types alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), CadenceError> {
        if !(1970..=9999).contains(&self.dataset.year) {
            return Err(CadenceError::Config(format!(
                "dataset.year must be between 1970 and 9999, got {}",
                self.dataset.year
            )));
        }
        if self.reviews.smoothing_window == 0 {
            return Err(CadenceError::Config(
                "reviews.smoothing_window must be at least 1".into(),
            ));
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(CadenceError::Config(format!(
                "chart size must be non-zero, got {}x{}",
                self.charts.width, self.charts.height
            )));
        }
        Ok(())
    }
}

/// Dataset locations and the year every routine reports on.
///
/// The `reviews` path may contain a `{year}` placeholder, resolved by
/// [`DatasetConfig::reviews_path`].
///
/// # Examples
///
/// ```
/// use cadence_core::DatasetConfig;
///
/// let config = DatasetConfig::default();
/// assert_eq!(
///     config.reviews_path().to_str(),
///     Some("phab_firefox_revisions_2021.json")
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Target calendar year (default: 2021).
    #[serde(default = "default_year")]
    pub year: i32,
    /// Commit CSV with `author` and `date` columns.
    #[serde(default = "default_commits")]
    pub commits: PathBuf,
    /// Where the first-commit-per-author CSV is written and re-read.
    #[serde(default = "default_first_commits")]
    pub first_commits: PathBuf,
    /// Review revisions JSON; `{year}` is replaced by [`Self::year`].
    #[serde(default = "default_reviews")]
    pub reviews: String,
}

impl DatasetConfig {
    /// Resolve the review file path for the configured year.
    pub fn reviews_path(&self) -> PathBuf {
        PathBuf::from(self.reviews.replace("{year}", &self.year.to_string()))
    }
}

fn default_year() -> i32 {
    2021
}

fn default_commits() -> PathBuf {
    PathBuf::from("firefox_commits.csv")
}

fn default_first_commits() -> PathBuf {
    PathBuf::from("firefox_first_commits.csv")
}

fn default_reviews() -> String {
    "phab_firefox_revisions_{year}.json".into()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            commits: default_commits(),
            first_commits: default_first_commits(),
            reviews: default_reviews(),
        }
    }
}

/// Chart output configuration.
///
/// # Examples
///
/// ```
/// use cadence_core::ChartConfig;
///
/// let config = ChartConfig::default();
/// assert!(config.enabled);
/// assert_eq!((config.width, config.height), (1500, 800));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Render SVG charts (default: true).
    #[serde(default = "default_charts_enabled")]
    pub enabled: bool,
    /// Directory charts are written into (default: `charts`).
    #[serde(default = "default_charts_dir")]
    pub dir: PathBuf,
    /// Chart width in pixels (default: 1500).
    #[serde(default = "default_chart_width")]
    pub width: u32,
    /// Chart height in pixels (default: 800).
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

fn default_charts_enabled() -> bool {
    true
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_chart_width() -> u32 {
    1500
}

fn default_chart_height() -> u32 {
    800
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: default_charts_enabled(),
            dir: default_charts_dir(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

/// Review-transaction analysis configuration.
///
/// # Examples
///
/// ```
/// use cadence_core::{ReviewConfig, ReviewTimezone};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.timezone, ReviewTimezone::Local);
/// assert_eq!(config.smoothing_window, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Timezone epoch timestamps are converted into (default: local).
    #[serde(default)]
    pub timezone: ReviewTimezone,
    /// Width of the centered rolling mean over weekly counts (default: 4).
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

fn default_smoothing_window() -> usize {
    4
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            timezone: ReviewTimezone::default(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

/// Wall clock used when turning epoch seconds into calendar dates.
///
/// # Examples
///
/// ```
/// use cadence_core::ReviewTimezone;
///
/// let tz: ReviewTimezone = "utc".parse().unwrap();
/// assert_eq!(tz, ReviewTimezone::Utc);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewTimezone {
    /// The machine's local timezone.
    #[default]
    Local,
    /// Coordinated Universal Time.
    Utc,
}

impl fmt::Display for ReviewTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewTimezone::Local => write!(f, "local"),
            ReviewTimezone::Utc => write!(f, "utc"),
        }
    }
}

impl FromStr for ReviewTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ReviewTimezone::Local),
            "utc" => Ok(ReviewTimezone::Utc),
            other => Err(format!("unknown timezone: {other}")),
        }
    }
}
