use anyhow::{anyhow, Context, Result};
use script_core::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the env filter from the configured level and per-module levels
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;

    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| anyhow!("Invalid log directive {:?}: {}", directive, e))?,
        );
    }
    Ok(filter)
}

/// Initialize logging. The returned guard must be held for the life of the
/// process when a log file is configured, or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    let (file_layer, guard) = match &config.log_file {
        Some(log_file) => {
            let appender = create_file_appender(log_file)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if config.json_format {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(config.enable_colors)
            .boxed()
    };

    // Try to initialize logging, ignore if already initialized
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    match result {
        Ok(_) => tracing::debug!("Logging initialized with level: {}", config.level),
        Err(_) => tracing::debug!("Logging already initialized, skipping"),
    }

    Ok(guard)
}

/// Daily-rolling file appender for `log_file`
fn create_file_appender(log_file: &str) -> Result<tracing_appender::rolling::RollingFileAppender> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let log_path = Path::new(log_file);
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let filename = log_path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid log file name: {}", log_file))?
        .to_string_lossy();

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    Ok(RollingFileAppender::new(
        Rotation::DAILY,
        directory,
        filename.as_ref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_builds() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_module_directive_rejected() {
        let mut config = LoggingConfig::default();
        config
            .module_levels
            .insert("script_core".to_string(), "verbose".to_string());
        assert!(build_filter(&config).is_err());
    }
}
