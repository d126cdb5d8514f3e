//! Runs over frame sequences.
//!
//! Every frame goes through segment → select → measure →
//! calibrate, and its outcome is folded into an
//! [`Aggregator`]. Whether a failed frame is skipped, ends the
//! run normally or aborts it is decided in one place,
//! [`Step::classify`]:
//!
//! - no region / no calibration: skip the frame, keep going;
//! - unreadable first frame, bad configuration: abort;
//! - unreadable later frame: end of stream for streamed
//!   sources, skip for indexed ones.
use std::iter;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde_derive::*;

use crate::{
    calibration::{fixed_geometry, CalibrationFactor, LineWidthCalibration},
    config::{DropletConfig, FlameConfig},
    error::{MeasureError, Result},
    frame::{ColorFrame, GrayFrame},
    measure::{band_areas, extract, RawMeasurement},
    region::RegionSelector,
    segment::{ColorRangeSegmenter, Segmenter, ThresholdSegmenter},
    source::IndexedSource,
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoRegion,
    CalibrationUnavailable,
    Unreadable,
}

/// Handling of a frame that cannot be read, other than the
/// first one of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    EndOfStream,
    SkipFrame,
}

#[derive(Debug)]
pub enum Step<T> {
    Accept(T),
    Skip(SkipReason),
    Finish,
    Abort(MeasureError),
}

impl<T> Step<T> {
    /// Decides what the run does with the outcome of the
    /// frame at `position` (0 for the first frame read).
    pub fn classify(position: usize, on_read_failure: ReadFailure, outcome: Result<T>) -> Self {
        match outcome {
            Ok(sample) => Step::Accept(sample),
            Err(MeasureError::NoRegionFound) => Step::Skip(SkipReason::NoRegion),
            Err(MeasureError::CalibrationUnavailable(_)) => {
                Step::Skip(SkipReason::CalibrationUnavailable)
            }
            Err(e) if e.is_read_error() && position > 0 => match on_read_failure {
                ReadFailure::EndOfStream => Step::Finish,
                ReadFailure::SkipFrame => Step::Skip(SkipReason::Unreadable),
            },
            Err(e) => Step::Abort(e),
        }
    }
}

pub trait Aggregator {
    type Sample;
    type Summary;

    fn accept(&mut self, index: u64, sample: Self::Sample);
    fn skip(&mut self, index: u64, reason: SkipReason);
    fn finalize(self) -> Result<Self::Summary>;
}

/// Folds ordered `(frame index, outcome)` pairs into
/// `aggregator`.
pub fn drive<A, I>(mut aggregator: A, on_read_failure: ReadFailure, outcomes: I) -> Result<A::Summary>
where
    A: Aggregator,
    I: IntoIterator<Item = (u64, Result<A::Sample>)>,
{
    for (position, (index, outcome)) in outcomes.into_iter().enumerate() {
        match Step::classify(position, on_read_failure, outcome) {
            Step::Accept(sample) => aggregator.accept(index, sample),
            Step::Skip(reason) => {
                debug!("frame {}: skipped ({:?})", index, reason);
                aggregator.skip(index, reason);
            }
            Step::Finish => {
                debug!("frame {}: end of stream", index);
                break;
            }
            Step::Abort(e) => return Err(e),
        }
    }
    aggregator.finalize()
}

/// Frame counters of a run.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounts {
    pub processed: usize,
    pub measured: usize,
    pub no_region: usize,
    pub calibration_unavailable: usize,
    pub unreadable: usize,
}

impl RunCounts {
    fn record_skip(&mut self, reason: SkipReason) {
        self.processed += 1;
        match reason {
            SkipReason::NoRegion => self.no_region += 1,
            SkipReason::CalibrationUnavailable => self.calibration_unavailable += 1,
            SkipReason::Unreadable => self.unreadable += 1,
        }
    }

    fn record_measured(&mut self) {
        self.processed += 1;
        self.measured += 1;
    }

    pub fn skipped(&self) -> usize {
        self.processed - self.measured
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DropletSample {
    pub index: u64,
    pub time_s: f64,
    pub diameter_px: usize,
    pub mm_per_px: f64,
    pub diameter_mm: f64,
    pub diameter_squared_mm2: f64,
}

/// Time series of calibrated droplet diameters, ordered by
/// frame index.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DropletSeries {
    pub samples: Vec<DropletSample>,
    pub counts: RunCounts,
}

impl DropletSeries {
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }

    pub fn diameters(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.diameter_mm).collect()
    }

    pub fn diameters_squared(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.diameter_squared_mm2).collect()
    }
}

#[derive(Default)]
struct DropletAggregator {
    samples: Vec<DropletSample>,
    counts: RunCounts,
}

impl Aggregator for DropletAggregator {
    type Sample = DropletSample;
    type Summary = DropletSeries;

    fn accept(&mut self, _index: u64, sample: DropletSample) {
        self.counts.record_measured();
        self.samples.push(sample);
    }

    fn skip(&mut self, _index: u64, reason: SkipReason) {
        self.counts.record_skip(reason);
    }

    fn finalize(self) -> Result<DropletSeries> {
        let counts = self.counts;
        if counts.processed == 0 {
            return Err(MeasureError::EmptyRun);
        }
        if counts.measured == 0 {
            warn!("no frame of {} yielded a diameter", counts.processed);
        }
        info!(
            "droplet run: {} frames, {} measured, {} without region, {} without calibration, {} unreadable",
            counts.processed,
            counts.measured,
            counts.no_region,
            counts.calibration_unavailable,
            counts.unreadable
        );
        Ok(DropletSeries {
            samples: self.samples,
            counts,
        })
    }
}

/// Vertical droplet diameter per still frame, calibrated
/// frame by frame against the reference line.
pub struct DropletPipeline {
    segmenter: ThresholdSegmenter,
    selector: RegionSelector,
    calibration: LineWidthCalibration,
    frame_rate: f64,
}

impl DropletPipeline {
    pub fn new(config: &DropletConfig) -> Result<Self> {
        config.validate()?;
        Ok(DropletPipeline {
            segmenter: ThresholdSegmenter::new(config),
            selector: RegionSelector::default(),
            calibration: LineWidthCalibration::new(config)?,
            frame_rate: config.frame_rate,
        })
    }

    pub fn measure(&self, frame: &GrayFrame) -> Result<(RawMeasurement, CalibrationFactor)> {
        let mask = self.segmenter.segment(frame);
        let region = self
            .selector
            .select(&mask)
            .ok_or(MeasureError::NoRegionFound)?;
        let raw = extract(&region);
        let factor = self.calibration.estimate(&mask)?;
        Ok((raw, factor))
    }

    pub fn sample(&self, index: u64, frame: &GrayFrame) -> Result<DropletSample> {
        let (raw, factor) = self.measure(frame)?;
        let diameter_mm = factor.to_physical(raw.vertical_px as f64);
        Ok(DropletSample {
            index,
            time_s: index as f64 / self.frame_rate,
            diameter_px: raw.vertical_px,
            mm_per_px: factor.units_per_pixel(),
            diameter_mm,
            diameter_squared_mm2: diameter_mm * diameter_mm,
        })
    }

    /// Reads the first frame of `source` on its own. A run
    /// whose first frame cannot be read fails here, before any
    /// other frame is touched.
    pub fn measure_first<S: IndexedSource>(
        &self,
        source: &S,
    ) -> Result<(u64, Result<DropletSample>)> {
        let index = *source.indices().start();
        let frame = source.read(index)?;
        Ok((index, self.sample(index, &frame)))
    }

    /// Outcomes of the frames after the first, computed in
    /// parallel but yielded in index order.
    pub fn measure_rest<'a, S: IndexedSource>(
        &'a self,
        source: &'a S,
    ) -> impl IndexedParallelIterator<Item = (u64, Result<DropletSample>)> + 'a {
        source
            .indices()
            .skip(1)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(move |index| {
                let outcome = source
                    .read(index)
                    .and_then(|frame| self.sample(index, &frame));
                (index, outcome)
            })
    }

    pub fn aggregate<I>(&self, outcomes: I) -> Result<DropletSeries>
    where
        I: IntoIterator<Item = (u64, Result<DropletSample>)>,
    {
        drive(
            DropletAggregator::default(),
            ReadFailure::SkipFrame,
            outcomes,
        )
    }

    pub fn run<S: IndexedSource>(&self, source: &S) -> Result<DropletSeries> {
        let indices = source.indices();
        info!("droplet run over frames {}..={}", indices.start(), indices.end());
        let first = self.measure_first(source)?;
        let rest: Vec<_> = self.measure_rest(source).collect();
        self.aggregate(iter::once(first).chain(rest))
    }
}

/// Measurements of one flame frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlameFrame {
    /// Selected flame region, if one passed the area filter.
    pub flame: Option<RawMeasurement>,
    pub band_pixels: Vec<usize>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BandTotal {
    pub name: String,
    pub pixels: u64,
}

/// Run-level flame summary.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FlameReport {
    pub average_length_cm: f64,

    /// Numerator band area over denominator band area;
    /// `+inf` when the denominator band never appeared.
    pub area_ratio: f64,
    pub numerator_band: String,
    pub denominator_band: String,
    pub cm_per_px: f64,
    pub frames: usize,
    pub frames_with_flame: usize,
    pub band_totals: Vec<BandTotal>,
}

struct FlameAggregator {
    calibration: CalibrationFactor,
    band_names: Vec<String>,
    numerator: usize,
    denominator: usize,
    total_length_px: u64,
    band_totals: Vec<u64>,
    frames: usize,
    frames_with_flame: usize,
}

impl Aggregator for FlameAggregator {
    type Sample = FlameFrame;
    type Summary = FlameReport;

    fn accept(&mut self, _index: u64, sample: FlameFrame) {
        self.frames += 1;
        if let Some(flame) = sample.flame {
            self.frames_with_flame += 1;
            self.total_length_px += flame.vertical_px as u64;
        }
        for (total, &px) in self.band_totals.iter_mut().zip(&sample.band_pixels) {
            *total += px as u64;
        }
    }

    fn skip(&mut self, _index: u64, _reason: SkipReason) {
        self.frames += 1;
    }

    fn finalize(self) -> Result<FlameReport> {
        if self.frames == 0 {
            return Err(MeasureError::EmptyRun);
        }
        let average_px = self.total_length_px as f64 / self.frames as f64;
        let numerator = self.band_totals[self.numerator];
        let denominator = self.band_totals[self.denominator];
        let area_ratio = if denominator == 0 {
            f64::INFINITY
        } else {
            numerator as f64 / denominator as f64
        };
        info!(
            "flame run: {} frames, {} with a flame region",
            self.frames, self.frames_with_flame
        );

        Ok(FlameReport {
            average_length_cm: self.calibration.to_physical(average_px),
            area_ratio,
            numerator_band: self.band_names[self.numerator].clone(),
            denominator_band: self.band_names[self.denominator].clone(),
            cm_per_px: self.calibration.units_per_pixel(),
            frames: self.frames,
            frames_with_flame: self.frames_with_flame,
            band_totals: self
                .band_names
                .into_iter()
                .zip(self.band_totals)
                .map(|(name, pixels)| BandTotal { name, pixels })
                .collect(),
        })
    }
}

/// Average flame length and band area ratio over a frame
/// stream, calibrated once from the first frame's height.
pub struct FlamePipeline {
    segmenter: ColorRangeSegmenter,
    selector: RegionSelector,
    window_height: f64,
    numerator: usize,
    denominator: usize,
}

impl FlamePipeline {
    pub fn new(config: &FlameConfig) -> Result<Self> {
        config.validate()?;
        Ok(FlamePipeline {
            segmenter: ColorRangeSegmenter::new(config),
            selector: RegionSelector::with_min_area(config.min_region_area),
            window_height: config.window_height_cm,
            numerator: config.band_index(&config.numerator_band)?,
            denominator: config.band_index(&config.denominator_band)?,
        })
    }

    pub fn measure(&self, frame: &ColorFrame) -> FlameFrame {
        let segmentation = self.segmenter.segment(frame);
        FlameFrame {
            flame: self.selector.select(&segmentation.mask).map(|r| extract(&r)),
            band_pixels: band_areas(&segmentation).to_vec(),
        }
    }

    pub fn run<I>(&self, frames: I) -> Result<FlameReport>
    where
        I: IntoIterator<Item = Result<ColorFrame>>,
    {
        let mut frames = frames.into_iter();
        let first = frames.next().ok_or(MeasureError::EmptyRun)??;

        let calibration = fixed_geometry(self.window_height, first.nrows())?;
        info!(
            "flame run: {:.4} cm/px from a {} px high frame",
            calibration.units_per_pixel(),
            first.nrows()
        );

        let aggregator = FlameAggregator {
            calibration,
            band_names: self
                .segmenter
                .bands()
                .iter()
                .map(|b| b.name.clone())
                .collect(),
            numerator: self.numerator,
            denominator: self.denominator,
            total_length_px: 0,
            band_totals: vec![0; self.segmenter.bands().len()],
            frames: 0,
            frames_with_flame: 0,
        };
        let outcomes = std::iter::once(Ok(first))
            .chain(frames)
            .zip(0..)
            .map(|(frame, index)| (index, frame.map(|f| self.measure(&f))));
        drive(aggregator, ReadFailure::EndOfStream, outcomes)
    }
}
