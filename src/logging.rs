use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file line layout: `timestamp - target - LEVEL - message`.
pub struct PlainLine;

impl<S, N> FormatEvent<S, N> for PlainLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "{} - {} - {} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            meta.target(),
            meta.level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber: human output on stderr filtered by
/// `RUST_LOG` or `stderr_level`, plus an append-only file at info when
/// `log_file` is given.
pub fn init(stderr_level: &str, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(stderr_level));
    let stderr_layer = tfmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file_layer = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("log file path {:?} has no file name", path))?;
            fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
            let appender = tracing_appender::rolling::never(dir, name);
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_writer(appender)
                    .event_format(PlainLine)
                    .with_filter(LevelFilter::INFO),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("installing log subscriber")
}

/// Last `lines` lines of the log file, optionally only those at `level`
/// (`INFO`, `WARN`, `ERROR`, ...). `None` when the file does not exist.
pub fn tail(path: &Path, lines: usize, level: Option<&str>) -> Result<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let marker = level.map(|l| format!(" - {} - ", l.to_ascii_uppercase()));

    let matching: Vec<&str> = contents
        .lines()
        .filter(|line| match &marker {
            Some(marker) => line.contains(marker.as_str()),
            None => true,
        })
        .collect();
    let skip = matching.len().saturating_sub(lines);
    Ok(Some(
        matching[skip..].iter().map(|l| l.to_string()).collect(),
    ))
}
