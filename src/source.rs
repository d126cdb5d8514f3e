//! Where frames come from.
//!
//! Droplet runs read still frames addressed by index
//! (`dir/Img000123.tif`), which can be fetched in any order.
//! Flame runs consume an ordered stream of frames, e.g. a
//! recording exported to stills; decoding video containers is
//! left to external tools.
use std::{ops::RangeInclusive, path::PathBuf};

use glob::glob;

use crate::{
    config::FilenamePattern,
    error::{MeasureError, Result},
    frame::{read_color, read_gray, ColorFrame, GrayFrame},
};

/// Random access to grayscale frames by index.
pub trait IndexedSource: Sync {
    fn indices(&self) -> RangeInclusive<u64>;
    fn read(&self, index: u64) -> Result<GrayFrame>;
}

/// Still frames in a directory, named by a
/// [`FilenamePattern`] over an inclusive index range.
#[derive(Debug, Clone)]
pub struct IndexedFrames {
    dir: PathBuf,
    pattern: FilenamePattern,
    start: u64,
    end: u64,
}

impl IndexedFrames {
    pub fn new<P: Into<PathBuf>>(
        dir: P,
        pattern: FilenamePattern,
        start: u64,
        end: u64,
    ) -> Result<Self> {
        if start > end {
            return Err(MeasureError::config(format!(
                "empty index range {}..={}",
                start, end
            )));
        }
        Ok(IndexedFrames {
            dir: dir.into(),
            pattern,
            start,
            end,
        })
    }

    pub fn path(&self, index: u64) -> PathBuf {
        self.dir.join(self.pattern.file_name(index))
    }
}

impl IndexedSource for IndexedFrames {
    fn indices(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    fn read(&self, index: u64) -> Result<GrayFrame> {
        read_gray(&self.path(index))
    }
}

/// Ordered colour frames, read lazily one at a time.
#[derive(Debug, Clone)]
pub struct FrameStream {
    paths: Vec<PathBuf>,
}

impl FrameStream {
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        FrameStream { paths }
    }

    /// All files matching a glob, in lexical order (so
    /// zero-padded frame numbers sort temporally).
    pub fn from_glob(pattern: &str) -> Result<Self> {
        let mut paths = glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        paths.sort();
        Ok(FrameStream { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn frames(&self) -> impl Iterator<Item = Result<ColorFrame>> + '_ {
        self.paths.iter().map(|p| read_color(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_paths() -> anyhow::Result<()> {
        let frames = IndexedFrames::new("/data/run", FilenamePattern::default(), 3, 5)?;
        assert_eq!(frames.path(4), PathBuf::from("/data/run/Img000004.tif"));
        assert_eq!(frames.indices().count(), 3);
        Ok(())
    }

    #[test]
    fn rejects_reversed_range() {
        assert!(IndexedFrames::new("/data", FilenamePattern::default(), 5, 4).is_err());
    }

    #[test]
    fn unreadable_index_is_a_read_error() -> anyhow::Result<()> {
        let frames = IndexedFrames::new("/nonexistent", FilenamePattern::default(), 0, 0)?;
        assert!(frames.read(0).unwrap_err().is_read_error());
        Ok(())
    }

    #[test]
    fn glob_without_matches_is_empty() -> anyhow::Result<()> {
        let stream = FrameStream::from_glob("/nonexistent-dir-for-tests/*.png")?;
        assert!(stream.is_empty());
        Ok(())
    }
}
