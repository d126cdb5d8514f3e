mod args;

use std::{
    io::{stdout, BufWriter, Write},
    iter,
};

use anyhow::{Context, Result};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde_derive::*;

use args::Args;
use combustion::{
    cli::{progress_bar, setup_logging},
    config::DropletConfig,
    pipeline::{DropletSample, DropletSeries, RunCounts},
    source::IndexedFrames,
    DropletPipeline,
};

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;
    let _logger = setup_logging(&args.log_level)?;

    let pipeline = DropletPipeline::new(&args.config)?;
    let frames = IndexedFrames::new(&args.dir, args.pattern.clone(), args.start, args.end)?;

    let failed = || format!("droplet run over {} failed", frames.path(args.start).display());
    let first = pipeline.measure_first(&frames).with_context(failed)?;

    let bar = progress_bar(args.end - args.start);
    let rest: Vec<_> = pipeline
        .measure_rest(&frames)
        .progress_with(bar)
        .collect();
    let series = pipeline
        .aggregate(iter::once(first).chain(rest))
        .with_context(failed)?;

    if args.csv {
        write_csv(&series)?;
    } else {
        #[derive(Debug, Serialize)]
        struct OutputJson<'a> {
            config: &'a DropletConfig,
            samples: &'a [DropletSample],
            counts: RunCounts,
        }

        serde_json::to_writer(
            stdout().lock(),
            &OutputJson {
                config: &args.config,
                samples: &series.samples,
                counts: series.counts,
            },
        )?;
    }

    Ok(())
}

fn write_csv(series: &DropletSeries) -> Result<()> {
    let stdout = stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "index,time_s,diameter_px,mm_per_px,diameter_mm,diameter_squared_mm2")?;
    for s in series.samples.iter() {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            s.index, s.time_s, s.diameter_px, s.mm_per_px, s.diameter_mm, s.diameter_squared_mm2
        )?;
    }
    out.flush()?;
    Ok(())
}
