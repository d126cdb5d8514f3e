mod args;

use anyhow::{Context, Result};

use args::Args;
use combustion::{cli::setup_logging, cli::Inflector, FlamePipeline};

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;
    let _logger = setup_logging(&args.log_level)?;

    let pipeline = FlamePipeline::new(&args.config)?;
    let report = pipeline
        .run(args.frames.frames())
        .context("flame analysis failed")?;

    if args.json {
        serde_json::to_writer(std::io::stdout().lock(), &report)?;
        return Ok(());
    }

    let ratio_label = format!(
        "{}-to-{} Area Ratio",
        report.numerator_band.to_title_case(),
        report.denominator_band.to_title_case()
    );
    println!("\n--- Flame Analysis Results ---");
    println!("{:<26}: {:.2} cm", "Average Flame Length", report.average_length_cm);
    println!("{:<26}: {:.2}", ratio_label, report.area_ratio);
    println!(
        "{:<26}: {} of {}",
        "Frames With Flame", report.frames_with_flame, report.frames
    );
    Ok(())
}
