use crate::client::{Direction, LifelogSource};
use crate::lifelog::Lifelog;
use crate::utils::{ExportConfig, ProcessResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use eyre::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub fallback: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.exported + self.fallback
    }
}

/// Offset-bearing ISO-8601 forms beyond RFC 3339: `-0500`, `-05`, no seconds,
/// space separator and the basic `YYYYMMDDTHHMMSS` layout.
const OFFSET_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
];

/// Parse an ISO-8601 timestamp. Offsets are honoured; naive forms are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let raw = raw.trim();
    let rfc_err = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => return Ok(dt),
        Err(e) => e,
    };
    let zulu = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => raw.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zulu, fmt) {
            return Ok(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc().fixed_offset());
    }
    Err(rfc_err)
}

/// `YYYY-MM-DD-HH-MM-SS.md` for `instant` as seen in `tz`.
pub fn timestamp_filename<T: TimeZone>(instant: &DateTime<T>, tz: &Tz) -> String {
    format!(
        "{}.md",
        instant.with_timezone(tz).format(FILENAME_FORMAT)
    )
}

/// `YYYY-MM-DD-HH-MM-SS-{index}.md` for records without a usable start time.
pub fn fallback_filename(now: &DateTime<Utc>, tz: &Tz, index: usize) -> String {
    format!(
        "{}-{}.md",
        now.with_timezone(tz).format(FILENAME_FORMAT),
        index
    )
}

fn write_markdown(target_dir: &Path, filename: &str, lifelog: &Lifelog) -> Result<()> {
    let path = target_dir.join(filename);
    fs::write(&path, lifelog.markdown())
        .wrap_err_with(|| format!("Failed to write: {}", path.display()))
}

fn dump_structure(lifelogs: &[Lifelog]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let Some(first) = lifelogs.first() else {
        return;
    };
    log::debug!("First lifelog keys: {:?}", first.keys());
    for (i, lifelog) in lifelogs.iter().take(3).enumerate() {
        match serde_json::to_string_pretty(lifelog) {
            Ok(json) => log::debug!("Lifelog {} structure:\n{}", i + 1, json),
            Err(e) => log::debug!("Lifelog {} could not be serialized: {}", i + 1, e),
        }
    }
}

fn export_lifelog<F, W>(
    lifelog: &Lifelog,
    index: usize,
    total: usize,
    config: &ExportConfig,
    now: &mut F,
    out: &mut W,
) -> Result<ProcessResult>
where
    F: FnMut() -> DateTime<Utc>,
    W: Write,
{
    let parsed = lifelog.start_time().map(|raw| (raw, parse_timestamp(raw)));

    match parsed {
        Some((_, Ok(start))) => {
            let filename = timestamp_filename(&start, &config.timezone);
            write_markdown(&config.target_dir, &filename, lifelog)?;
            writeln!(out, "[{}/{}] Exported: {}", index, total, filename)?;
            Ok(ProcessResult::Exported)
        }
        Some((raw, Err(e))) => {
            let filename = fallback_filename(&now(), &config.timezone, index);
            write_markdown(&config.target_dir, &filename, lifelog)?;
            writeln!(
                out,
                "[{}/{}] Error processing timestamp '{}': {}; using current time: {}",
                index, total, raw, e, filename
            )?;
            Ok(ProcessResult::Fallback)
        }
        None => {
            let filename = fallback_filename(&now(), &config.timezone, index);
            write_markdown(&config.target_dir, &filename, lifelog)?;
            writeln!(
                out,
                "[{}/{}] No timestamp found, using current time: {}",
                index, total, filename
            )?;
            Ok(ProcessResult::Fallback)
        }
    }
}

/// Write every lifelog to its own Markdown file inside `config.target_dir`.
///
/// Progress goes to stdout.
pub fn export(lifelogs: &[Lifelog], config: &ExportConfig) -> Result<ExportSummary> {
    export_with_clock(lifelogs, config, Utc::now, &mut io::stdout().lock())
}

/// Same as [`export`], with the clock used for fallback names and the progress
/// sink supplied by the caller.
pub fn export_with_clock<F, W>(
    lifelogs: &[Lifelog],
    config: &ExportConfig,
    mut now: F,
    out: &mut W,
) -> Result<ExportSummary>
where
    F: FnMut() -> DateTime<Utc>,
    W: Write,
{
    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;

    let total = lifelogs.len();
    writeln!(
        out,
        "Exporting {} lifelogs to {} directory...",
        total,
        config.target_dir.display()
    )?;
    dump_structure(lifelogs);

    let mut summary = ExportSummary::default();
    for (i, lifelog) in lifelogs.iter().enumerate() {
        match export_lifelog(lifelog, i + 1, total, config, &mut now, out)? {
            ProcessResult::Exported => summary.exported += 1,
            ProcessResult::Fallback => summary.fallback += 1,
        }
    }

    log::info!(
        "Wrote {} files ({} with fallback names)",
        summary.total(),
        summary.fallback
    );
    Ok(summary)
}

/// Fetch from `source` and export everything it returns, reporting to stdout.
///
/// A fetch failure aborts before the target directory is touched.
pub fn run<S: LifelogSource + ?Sized>(
    source: &S,
    direction: Direction,
    limit: Option<usize>,
    config: &ExportConfig,
) -> Result<ExportSummary> {
    run_with_output(
        source,
        direction,
        limit,
        config,
        Utc::now,
        &mut io::stdout().lock(),
    )
}

pub fn run_with_output<S, F, W>(
    source: &S,
    direction: Direction,
    limit: Option<usize>,
    config: &ExportConfig,
    now: F,
    out: &mut W,
) -> Result<ExportSummary>
where
    S: LifelogSource + ?Sized,
    F: FnMut() -> DateTime<Utc>,
    W: Write,
{
    match limit {
        Some(n) => writeln!(out, "Fetching up to {} lifelogs ({})...", n, direction)?,
        None => writeln!(out, "Fetching all lifelogs from beginning to now...")?,
    }
    let lifelogs = source
        .fetch(direction, limit)
        .wrap_err("Failed to fetch lifelogs")?;

    let summary = export_with_clock(&lifelogs, config, now, out)?;
    writeln!(out, "Export complete!")?;
    Ok(summary)
}
