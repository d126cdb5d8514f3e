use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::value_t_or_exit;
use combustion::{
    arg, args_parser,
    cli::{common_args, load_config},
    config::FlameConfig,
    opt,
    source::FrameStream,
};

pub struct Args {
    pub frames: FrameStream,
    pub config: FlameConfig,
    pub json: bool,
    pub log_level: String,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = common_args(args_parser!("flame-structure"))
            .about("Average flame length and yellow-to-blue area ratio of a flame recording.")
            .arg(
                opt!("window height")
                    .help("Physical height of the optical window in cm.  Default is 64"),
            )
            .arg(
                opt!("min area")
                    .help("Regions must be larger than this many pixels.  Default is 500"),
            )
            .arg(
                opt!("json")
                    .short("j")
                    .takes_value(false)
                    .help("Print the report as JSON"),
            )
            .arg(
                arg!("frames")
                    .required(true)
                    .multiple(true)
                    .help("Frame images in temporal order, or glob patterns (e.g. 'out/*.png')"),
            )
            .get_matches();

        let mut config: FlameConfig = load_config(matches.value_of("config"))?;
        if matches.is_present("window height") {
            config.window_height_cm = value_t_or_exit!(matches, "window height", f64);
        }
        if matches.is_present("min area") {
            config.min_region_area = value_t_or_exit!(matches, "min area", usize);
        }

        let mut paths: Vec<PathBuf> = vec![];
        for frame in matches.values_of("frames").into_iter().flatten() {
            if frame.contains(|c| c == '*' || c == '?' || c == '[') {
                let matched = FrameStream::from_glob(frame)?;
                ensure!(!matched.is_empty(), "no frames match `{}`", frame);
                paths.extend(matched.paths().iter().cloned());
            } else {
                paths.push(frame.into());
            }
        }

        Ok(Args {
            frames: FrameStream::from_paths(paths),
            config,
            json: matches.is_present("json"),
            log_level: matches.value_of("log level").unwrap_or("info").into(),
        })
    }
}
