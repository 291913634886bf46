//! SVG chart rendering with plotters.
//!
//! Monthly reports become bar charts with a value above each bar and a
//! total/average annotation; weekly review reports become a line chart of the
//! smoothed series.

use std::error::Error;
use std::path::{Path, PathBuf};

use cadence_core::{CadenceError, ChartConfig};
use cadence_history::monthly::{
    format_thousands, month_name, MonthlyReport, SeriesLabel, COMMITS, NEW_CONTRIBUTORS,
};
use cadence_history::reviews::WeeklyReport;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;

const FONT: &str = "sans-serif";
const REVIEW_LINE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

/// Styling and wording for one monthly bar chart.
///
/// # Examples
///
/// ```
/// use cadence_report::charts::COMMIT_SERIES;
///
/// assert_eq!(COMMIT_SERIES.file_stem, "monthly_commits");
/// assert_eq!(COMMIT_SERIES.label.plural, "commits");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SeriesSpec {
    /// Wording used in tables and annotations.
    pub label: SeriesLabel,
    /// Bar fill color.
    pub color: RGBColor,
    /// Chart title, followed by ` (<year>)`.
    pub title: &'static str,
    /// Y axis description.
    pub y_label: &'static str,
    /// File name prefix; the year and `.svg` are appended.
    pub file_stem: &'static str,
}

/// Monthly commit counts.
pub const COMMIT_SERIES: SeriesSpec = SeriesSpec {
    label: COMMITS,
    color: RGBColor(0x34, 0x98, 0xdb),
    title: "Monthly Commit Frequency",
    y_label: "Number of Commits",
    file_stem: "monthly_commits",
};

/// Monthly first-commit counts.
pub const NEW_CONTRIBUTOR_SERIES: SeriesSpec = SeriesSpec {
    label: NEW_CONTRIBUTORS,
    color: RGBColor(0xe7, 0x4c, 0x3c),
    title: "Monthly New Contributors",
    y_label: "Number of New Contributors",
    file_stem: "monthly_new_contributors",
};

/// Path a chart named `stem` for `year` is written to.
///
/// # Examples
///
/// ```
/// use cadence_core::ChartConfig;
/// use cadence_report::charts::chart_path;
///
/// let path = chart_path(&ChartConfig::default(), "weekly_reviews", 2021);
/// assert_eq!(path.to_str(), Some("charts/weekly_reviews_2021.svg"));
/// ```
pub fn chart_path(config: &ChartConfig, stem: &str, year: i32) -> PathBuf {
    config.dir.join(format!("{stem}_{year}.svg"))
}

/// Render a monthly bar chart and return the written SVG path.
///
/// # Errors
///
/// Returns [`CadenceError::Io`] if the chart directory cannot be created and
/// [`CadenceError::Chart`] if drawing fails.
pub fn render_monthly_chart(
    report: &MonthlyReport,
    spec: &SeriesSpec,
    config: &ChartConfig,
) -> Result<PathBuf, CadenceError> {
    let path = chart_path(config, spec.file_stem, report.year);
    ensure_dir(&config.dir)?;
    draw_monthly(&path, report, spec, (config.width, config.height))
        .map_err(|e| CadenceError::Chart(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "rendered monthly chart");
    Ok(path)
}

/// Render the smoothed weekly review line chart and return the SVG path.
///
/// Weeks without a smoothed value leave gaps at the ends of the line.
///
/// # Errors
///
/// Same as [`render_monthly_chart`].
pub fn render_weekly_chart(
    report: &WeeklyReport,
    config: &ChartConfig,
) -> Result<PathBuf, CadenceError> {
    let path = chart_path(config, "weekly_review_transactions", report.year);
    ensure_dir(&config.dir)?;
    draw_weekly(&path, report, (config.width, config.height))
        .map_err(|e| CadenceError::Chart(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "rendered weekly chart");
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<(), CadenceError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn draw_monthly(
    path: &Path,
    report: &MonthlyReport,
    spec: &SeriesSpec,
    size: (u32, u32),
) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let peak = report.months.iter().map(|m| m.count).max().unwrap_or(0);
    // headroom for the value labels
    let y_max = peak + peak / 8 + 1;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} ({})", spec.title, report.year), (FONT, 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d((1u32..12u32).into_segmented(), 0u64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(12)
        .x_desc("Month")
        .y_desc(spec.y_label)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(m) | SegmentValue::Exact(m) => {
                month_name(*m).get(..3).unwrap_or_default().to_string()
            }
            SegmentValue::Last => String::new(),
        })
        .y_label_formatter(&|y| format_thousands(*y))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(spec.color.mix(0.7).filled())
            .margin(8)
            .data(report.months.iter().map(|m| (m.month, m.count))),
    )?;

    let value_style =
        TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(report.months.iter().map(|m| {
        Text::new(
            format_thousands(m.count),
            (SegmentValue::CenterOf(m.month), m.count),
            value_style.clone(),
        )
    }))?;

    let annotation = [
        format!(
            "Total {} in {}: {}",
            report.subject,
            report.year,
            format_thousands(report.total)
        ),
        format!("Monthly average: {:.1}", report.average),
    ];
    let (x0, y0) = (110, 70);
    root.draw(&Rectangle::new(
        [(x0 - 10, y0 - 10), (x0 + 380, y0 + 46)],
        WHITE.mix(0.8).filled(),
    ))?;
    for (idx, line) in annotation.iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (x0, y0 + idx as i32 * 22),
            (FONT, 18).into_font(),
        ))?;
    }

    root.present()?;
    Ok(())
}

fn draw_weekly(
    path: &Path,
    report: &WeeklyReport,
    size: (u32, u32),
) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let weeks = &report.weeks;
    let points: Vec<(i32, f64)> = weeks
        .iter()
        .enumerate()
        .filter_map(|(idx, w)| w.smoothed.map(|s| (idx as i32, s)))
        .collect();
    let x_max = (weeks.len() as i32 - 1).max(1);
    let peak = points.iter().map(|(_, y)| *y).fold(0.0f64, f64::max);
    let y_max = peak * 1.1 + 1.0;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Code Review Transactions per Week ({})", report.year),
            (FONT, 26),
        )
        .margin(20)
        .x_label_area_size(110)
        .y_label_area_size(80)
        .build_cartesian_2d(0i32..x_max, 0f64..y_max)?;

    let date_style = TextStyle::from((FONT, 13).into_font().transform(FontTransform::Rotate90));
    chart
        .configure_mesh()
        .x_labels(weeks.len().clamp(2, 27))
        .x_desc("Week")
        .y_desc("Number of Transactions")
        .x_label_style(date_style)
        .x_label_formatter(&|idx| {
            usize::try_from(*idx)
                .ok()
                .and_then(|i| weeks.get(i))
                .map(|w| w.week_ending.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .draw()?;

    chart.draw_series(LineSeries::new(points, REVIEW_LINE.stroke_width(2)))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_history::reviews::WeekCount;
    use chrono::NaiveDate;

    fn config_in(dir: &Path) -> ChartConfig {
        ChartConfig {
            dir: dir.join("charts"),
            width: 640,
            height: 400,
            ..ChartConfig::default()
        }
    }

    #[test]
    fn monthly_chart_is_written_as_svg() {
        let dir = tempfile::tempdir().unwrap();
        let mut counts = [0u64; 12];
        counts[2] = 1234;
        counts[7] = 56;
        let report = MonthlyReport::from_counts(COMMITS, 2021, counts);

        let path = render_monthly_chart(&report, &COMMIT_SERIES, &config_in(dir.path())).unwrap();
        assert_eq!(path.file_name().unwrap(), "monthly_commits_2021.svg");

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Monthly Commit Frequency (2021)"));
        assert!(svg.contains("1,234"));
        assert!(svg.contains("Total commits in 2021: 1,290"));
    }

    #[test]
    fn empty_monthly_report_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let report = MonthlyReport::from_counts(NEW_CONTRIBUTORS, 2021, [0; 12]);
        let path =
            render_monthly_chart(&report, &NEW_CONTRIBUTOR_SERIES, &config_in(dir.path())).unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "monthly_new_contributors_2021.svg");
    }

    #[test]
    fn weekly_chart_is_written_as_svg() {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
        let weeks = (0..6)
            .map(|i| WeekCount {
                week_ending: start + chrono::Days::new(7 * i),
                count: 10 + i,
                smoothed: (2..5).contains(&i).then_some(11.5 + i as f64),
            })
            .collect();
        let report = WeeklyReport {
            year: 2021,
            window: 4,
            weeks,
        };

        let path = render_weekly_chart(&report, &config_in(dir.path())).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Code Review Transactions per Week (2021)"));
    }

    #[test]
    fn series_specs_use_distinct_colors() {
        assert_ne!(COMMIT_SERIES.color, NEW_CONTRIBUTOR_SERIES.color);
        assert_ne!(COMMIT_SERIES.file_stem, NEW_CONTRIBUTOR_SERIES.file_stem);
    }
}
