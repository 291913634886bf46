//! Commit and review history aggregation.
//!
//! Loads commit CSVs and review-transaction JSON, then buckets timestamps into
//! calendar periods: dense monthly counts for a target year, first commits per
//! author, and smoothed weekly review activity. Git repositories can be
//! exported to the commit CSV format with [`mining`].

pub mod contributors;
pub mod loader;
pub mod mining;
pub mod monthly;
pub mod reviews;
