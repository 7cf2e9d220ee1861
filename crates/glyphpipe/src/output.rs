use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use glyphpipe_rpc::ExchangeStats;
use serde::Serialize;

use crate::replay::ReplaySummary;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// How long the rasterizer spent replaying over the pipes.
#[derive(Debug, Clone, Copy)]
pub struct ReplayTiming {
    pub passes: u32,
    pub elapsed: Duration,
}

/// What the rasterizer reports at the end of a session.
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub mode: &'static str,
    pub parent: &'static str,
    pub runs: u64,
    pub glyphs: u64,
    pub images: u64,
    pub image_bytes: u64,
    pub path_verbs: u64,
    pub checksum: String,
    pub requests: u64,
    pub frame_bytes_written: u64,
    pub frame_bytes_read: u64,
    pub trailing_bytes_read: u64,
    pub passes: u32,
    /// Wall-clock time of all passes, in milliseconds.
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl RunReport {
    pub fn new(
        mode: &'static str,
        parent: &'static str,
        summary: &ReplaySummary,
        stats: &ExchangeStats,
        timing: ReplayTiming,
        verified: Option<bool>,
    ) -> Self {
        Self {
            mode,
            parent,
            runs: summary.runs,
            glyphs: summary.glyphs,
            images: summary.images,
            image_bytes: summary.image_bytes,
            path_verbs: summary.path_verbs,
            checksum: format!("{:016x}", summary.checksum),
            requests: stats.requests,
            frame_bytes_written: stats.frame_bytes_written,
            frame_bytes_read: stats.frame_bytes_read,
            trailing_bytes_read: stats.trailing_bytes_read,
            passes: timing.passes,
            elapsed_ms: timing.elapsed.as_micros() as f64 / 1000.0,
            verified,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("mode", self.mode.to_string()),
            ("parent", self.parent.to_string()),
            ("runs", self.runs.to_string()),
            ("glyphs", self.glyphs.to_string()),
            ("images", self.images.to_string()),
            ("image bytes", self.image_bytes.to_string()),
            ("path verbs", self.path_verbs.to_string()),
            ("checksum", self.checksum.clone()),
            ("requests", self.requests.to_string()),
            ("frame bytes written", self.frame_bytes_written.to_string()),
            ("frame bytes read", self.frame_bytes_read.to_string()),
            ("trailing bytes read", self.trailing_bytes_read.to_string()),
            ("passes", self.passes.to_string()),
            ("elapsed", format!("{:.3} ms", self.elapsed_ms)),
        ];
        if let Some(verified) = self.verified {
            rows.push(("verified", verified.to_string()));
        }
        rows
    }
}

/// Print `report` and flush stdout.
///
/// Flushing matters when the caller is a forked child, which leaves without
/// running the usual exit-time flush.
pub fn print_report(report: &RunReport, format: OutputFormat) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(report).map_err(io::Error::other)?;
            writeln!(out, "{json}")?;
        }
        OutputFormat::Table => {
            writeln!(out, "{}", key_value_table(&report.rows()))?;
        }
        OutputFormat::Pretty => {
            writeln!(out, "Replay:")?;
            for (key, value) in report.rows() {
                writeln!(out, "  {:<20} {value}", format!("{key}:"))?;
            }
        }
    }
    out.flush()
}

pub fn key_value_table(rows: &[(&'static str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"]);
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value.clone()]);
    }
    table
}
