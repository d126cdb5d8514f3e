//! Measurements from combustion imaging experiments.
//!
//! This crate provides two offline analyses built on one
//! per-frame pipeline (segment → select region → measure →
//! calibrate → accumulate):
//!
//! 1. [Droplet diameter](pipeline::DropletPipeline): the
//! vertical diameter of a burning droplet in each still frame
//! of a back-lit sequence, calibrated frame by frame against
//! a dark reference line of known width. The resulting `d`
//! and `d²` series over time are what a burning-rate fit
//! consumes.
//!
//! 2. [Flame structure](pipeline::FlamePipeline): the average
//! flame length over a frame stream, and the ratio of yellow
//! (sooting) to blue (premixed) flame area, calibrated once
//! from the known height of the optical window.
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use combustion::{
//!     config::{DropletConfig, FilenamePattern},
//!     pipeline::DropletPipeline,
//!     source::IndexedFrames,
//! };
//!
//! let pipeline = DropletPipeline::new(&DropletConfig::default())?;
//! let frames = IndexedFrames::new("run01", FilenamePattern::default(), 0, 17976)?;
//! let series = pipeline.run(&frames)?;
//! for (t, d) in series.times().iter().zip(series.diameters()) {
//!     println!("{} {}", t, d);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use combustion::{config::FlameConfig, pipeline::FlamePipeline, source::FrameStream};
//!
//! let stream = FrameStream::from_glob("flame/frame_*.png")?;
//! let report = FlamePipeline::new(&FlameConfig::default())?.run(stream.frames())?;
//! println!("{:.2} cm, ratio {:.2}", report.average_length_cm, report.area_ratio);
//! # Ok(())
//! # }
//! ```
//!
//! Per-frame failures (no region, no reference line) never
//! abort a run; they are counted in
//! [`RunCounts`](pipeline::RunCounts). Only an unreadable
//! first frame or an invalid configuration does.

pub mod error;
pub mod config;
pub mod frame;
pub mod color;
pub mod morphology;
pub mod segment;
pub mod region;
pub mod measure;
pub mod calibration;
pub mod source;
pub mod pipeline;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::error::{MeasureError, Result};
pub use crate::pipeline::{DropletPipeline, FlamePipeline};
