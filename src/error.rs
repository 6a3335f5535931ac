//! Fatal error taxonomy.
//!
//! Expected absence (no region, no match, unknown board size) is never an error
//! and is returned as `None` or an outcome variant. The variants below mean the
//! stored preset or corpus contradicts itself, or an external dependency is
//! missing, and the run must stop.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FatalError {
    #[error("expected {expected} clusters but resolved {actual}")]
    ClusterCountMismatch { expected: usize, actual: usize },

    #[error("resolved {begins} begin coordinates but {ends} end coordinates")]
    BoundCountMismatch { begins: usize, ends: usize },

    #[error("resolved {rows} rows but {cols} columns")]
    AxisCountMismatch { rows: usize, cols: usize },

    #[error("side length {side} maps to both size {first} and size {second}")]
    DuplicateSideLength {
        side: u32,
        first: usize,
        second: usize,
    },

    #[error(
        "competing factor for tag {tag} is not positive (best {best}, competitor {competitor})"
    )]
    NonPositiveCompetingFactor {
        tag: String,
        best: f64,
        competitor: f64,
    },

    #[error("cell bounds for {resolution}, size {size}x{size} are invalid: {reason}")]
    InvalidCellBounds {
        resolution: String,
        size: usize,
        reason: String,
    },

    #[error("preset has no entry for resolution {resolution}{}", size_suffix(.size))]
    MissingPreset {
        resolution: String,
        size: Option<usize>,
    },

    #[error("solver binary not found: {}", .path.display())]
    SolverUnavailable { path: PathBuf },

    #[error("screenshot is {actual}, expected {expected}")]
    ScreenshotDimensionMismatch { expected: String, actual: String },
}

fn size_suffix(size: &Option<usize>) -> String {
    match size {
        Some(n) => format!(", size {}x{}", n, n),
        None => String::new(),
    }
}
