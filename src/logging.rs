use std::path::PathBuf;

use color_eyre::Result;
use color_eyre::eyre::Context;
use fern::colors::{Color, ColoredLevelConfig};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Console output at `console_level`, plus an optional plain-text log file at `file_level`.
pub fn setup_logging(
    console_level: log::LevelFilter,
    log_file: Option<PathBuf>,
    file_level: log::LevelFilter,
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {} {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT),
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        // noisy HTTP internals
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .chain(console);

    if let Some(path) = log_file {
        let file = fern::log_file(&path)
            .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(file_level)
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {} [{}] {}",
                        chrono::Local::now().format(TIMESTAMP_FORMAT),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    dispatch
        .apply()
        .wrap_err("Failed to initialize logging")?;
    Ok(())
}
