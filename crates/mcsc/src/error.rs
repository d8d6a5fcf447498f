use std::{io, path::PathBuf};

use mcsc_core::MatrixError;

/// Errors produced while building calibration directories, running the
/// solver or reading its results.
#[derive(thiserror::Error, Debug)]
pub enum McscError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Malformed ASCII matrix content.
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Related matrices disagree on a dimension.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    Shape {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("camera {0:?} has no observations")]
    MissingObservations(String),

    #[error("camera {0:?} has no resolution")]
    MissingResolution(String),

    #[error("calibration format of {} not supported (expected .rad or .yaml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("no converter installed for vendor calibration {}", .0.display())]
    NoConverter(PathBuf),

    #[error("failed to convert {} into a .rad file", src.display())]
    Convert {
        src: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The solver ran to completion but exited unsuccessfully.
    ///
    /// Never produced by the runner itself; see [`crate::RunOutcome::check`].
    #[error("solver exited with code {code:?}")]
    ProcessExit {
        code: Option<i32>,
        stderr: Option<PathBuf>,
    },

    #[error("solver worker thread terminated without reporting")]
    WorkerLost,
}
