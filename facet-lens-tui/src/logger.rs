use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("facet-lens")
        .join("facet-lens.log")
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
/// With `log_file` set, output is appended there instead of stderr.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            // stderr would draw over the terminal UI
            Err(_) => {
                builder.filter_level(LevelFilter::Off);
            }
        }
    }
    let _ = builder.try_init();
}
