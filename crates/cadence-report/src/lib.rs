//! Report routines: aggregate, chart, and render.
//!
//! Each routine in [`pipeline`] runs one analysis over the configured
//! datasets, writes its chart with [`charts`], and returns an outcome that
//! renders as text, Markdown, or JSON.

pub mod charts;
pub mod pipeline;
