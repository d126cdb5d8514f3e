use std::path::PathBuf;

use anyhow::Result;
use clap::value_t_or_exit;
use combustion::{
    arg, args_parser,
    cli::{common_args, load_config},
    config::{DropletConfig, FilenamePattern},
    opt,
};

pub struct Args {
    pub dir: PathBuf,
    pub pattern: FilenamePattern,
    pub start: u64,
    pub end: u64,
    pub config: DropletConfig,
    pub csv: bool,
    pub log_level: String,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = common_args(args_parser!("droplet-diameter"))
            .about("Track the vertical diameter of a burning droplet over a frame sequence.")
            .arg(
                opt!("pattern")
                    .short("p")
                    .default_value("Img{index:06}.tif")
                    .help("Frame file name, with an `{index}` or `{index:0N}` placeholder"),
            )
            .arg(
                opt!("start")
                    .short("s")
                    .default_value("0")
                    .help("First frame index"),
            )
            .arg(
                opt!("end")
                    .short("e")
                    .required(true)
                    .help("Last frame index (inclusive)"),
            )
            .arg(opt!("fps").help("Capture rate in frames per second.  Default is 4000"))
            .arg(
                opt!("line width")
                    .short("w")
                    .help("Width of the dark reference line in mm.  Default is 0.2"),
            )
            .arg(opt!("crop").help("Fraction of rows kept from the top.  Default is 0.6"))
            .arg(opt!("kernel").help("Side of the opening neighborhood.  Default is 3"))
            .arg(
                opt!("scanline")
                    .help("Calibration scanline as a fraction of the cropped height.  Default is 0.5"),
            )
            .arg(
                opt!("csv")
                    .takes_value(false)
                    .help("Write the series as CSV (default: JSON)"),
            )
            .arg(
                arg!("dir")
                    .required(true)
                    .help("Directory holding the frames"),
            )
            .get_matches();

        let mut config: DropletConfig = load_config(matches.value_of("config"))?;
        if matches.is_present("fps") {
            config.frame_rate = value_t_or_exit!(matches, "fps", f64);
        }
        if matches.is_present("line width") {
            config.line_width_mm = value_t_or_exit!(matches, "line width", f64);
        }
        if matches.is_present("crop") {
            config.crop_fraction = value_t_or_exit!(matches, "crop", f64);
        }
        if matches.is_present("kernel") {
            config.kernel_size = value_t_or_exit!(matches, "kernel", usize);
        }
        if matches.is_present("scanline") {
            config.scanline_fraction = value_t_or_exit!(matches, "scanline", f64);
        }

        Ok(Args {
            dir: value_t_or_exit!(matches, "dir", PathBuf),
            pattern: matches.value_of("pattern").unwrap_or_default().parse()?,
            start: value_t_or_exit!(matches, "start", u64),
            end: value_t_or_exit!(matches, "end", u64),
            config,
            csv: matches.is_present("csv"),
            log_level: matches.value_of("log level").unwrap_or("info").into(),
        })
    }
}
