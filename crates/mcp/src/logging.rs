//! Tracing setup shared by both transports.
//!
//! Logs always go to stderr: on the stdio transport stdout carries protocol frames.
//! The filter sits behind a reload handle so `logging/setLevel` can change it at
//! runtime.

use crate::protocol::LoggingLevel;
use anyhow::{Context, Result};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Targets whose level `logging/setLevel` controls
const APP_TARGETS: [&str; 3] = ["scaffold", "scaffold_mcp", "scaffold_core"];

/// Receives `logging/setLevel` requests
pub trait LogLevelSink: Send + Sync {
    fn set_level(&self, level: LoggingLevel) -> Result<()>;
}

/// Handle onto the installed subscriber's filter
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Directives the subscriber started with; level changes are layered on top
    base: String,
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) -> Result<LogControl> {
    let base = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if EnvFilter::try_new(&from_env).is_ok() => from_env,
        _ => default_filter.to_string(),
    };
    let (filter, control) = reloadable_filter(base)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(control)
}

fn reloadable_filter(base: String) -> Result<(reload::Layer<EnvFilter, Registry>, LogControl)> {
    let filter = EnvFilter::try_new(&base).context("Invalid log filter")?;
    let (layer, handle) = reload::Layer::new(filter);
    Ok((layer, LogControl { handle, base }))
}

impl LogControl {
    /// Base directives with the application targets pinned to `level`
    fn filter_for(&self, level: LevelFilter) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.base).context("Invalid log filter")?;
        for target in APP_TARGETS {
            let directive: Directive = format!("{}={}", target, level)
                .parse()
                .context("Invalid log directive")?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

impl LogLevelSink for LogControl {
    fn set_level(&self, level: LoggingLevel) -> Result<()> {
        let filter_level = level_filter(level);
        self.handle
            .reload(self.filter_for(filter_level)?)
            .context("Failed to reload log filter")?;

        // Announced at the new level so it is not filtered out
        if filter_level == LevelFilter::ERROR {
            tracing::error!("Log level set to {:?}", level);
        } else if filter_level == LevelFilter::WARN {
            tracing::warn!("Log level set to {:?}", level);
        } else {
            tracing::info!("Log level set to {:?}", level);
        }
        Ok(())
    }
}

/// Closest tracing level for an MCP severity
pub fn level_filter(level: LoggingLevel) -> LevelFilter {
    match level {
        LoggingLevel::Debug => LevelFilter::DEBUG,
        LoggingLevel::Info | LoggingLevel::Notice => LevelFilter::INFO,
        LoggingLevel::Warning => LevelFilter::WARN,
        LoggingLevel::Error
        | LoggingLevel::Critical
        | LoggingLevel::Alert
        | LoggingLevel::Emergency => LevelFilter::ERROR,
    }
}
