//! Error kinds raised while measuring frames.
//!
//! Only [`FrameRead`][MeasureError::FrameRead] on the first
//! frame of a run and [`Configuration`][MeasureError::Configuration]
//! ever reach the caller of a run; the per-frame kinds are
//! absorbed by the run loop and show up as skip counters.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("could not read frame {path:?}")]
    FrameRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame buffer has unexpected shape")]
    Shape(#[from] ndarray::ShapeError),

    #[error("invalid frame glob")]
    Pattern(#[from] glob::PatternError),

    #[error("could not list frame")]
    Glob(#[from] glob::GlobError),

    #[error("no qualifying region in frame")]
    NoRegionFound,

    #[error("calibration unavailable: {0}")]
    CalibrationUnavailable(&'static str),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("run has no frames")]
    EmptyRun,
}

impl MeasureError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        MeasureError::Configuration(msg.into())
    }

    /// Whether the error came from reading a frame (as
    /// opposed to measuring one that was read).
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            MeasureError::FrameRead { .. } | MeasureError::Shape(_) | MeasureError::Glob(_)
        )
    }
}

pub type Result<T, E = MeasureError> = std::result::Result<T, E>;
