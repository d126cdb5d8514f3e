//! Helpers shared by the accompanying binaries.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::{fs::File, io::BufReader};

use anyhow::{Context, Result};
pub use clap::{App, Arg};
use flexi_logger::{Logger, LoggerHandle};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use serde::de::DeserializeOwned;

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// `--config` and `--log-level`, common to every binary.
pub fn common_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("config")
            .long("config")
            .short("c")
            .value_name("CONFIG")
            .help("JSON file with run settings (flags below override it)"),
    )
    .arg(
        Arg::with_name("log level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .default_value("info")
            .help("Log specification, e.g. `debug` or `combustion=trace`"),
    )
}

/// Logs to stderr; stdout is reserved for results.
pub fn setup_logging(spec: &str) -> Result<LoggerHandle> {
    Logger::try_with_str(spec)
        .with_context(|| format!("invalid log specification `{}`", spec))?
        .log_to_stderr()
        .start()
        .context("could not start logger")
}

/// Settings from the JSON file at `path`, or the defaults.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("could not open {}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("could not parse config {}", path))
        }
        None => Ok(T::default()),
    }
}

pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );
    bar
}
