// Report generation from mirror results

use crate::mirror::extract_url_path;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use sitedown_engine::{MirrorResult, Outcome, ResourceKind};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub saved: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Saved => self.saved += 1,
            Outcome::SkippedExisting => self.skipped_existing += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.saved + self.skipped_existing + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub url: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSection {
    pub host: String,
    pub entries: Vec<HostEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub error: String,
}

/// Summary of one mirror run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorReport {
    pub seeds: Vec<String>,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: OutcomeCounts,
    /// Keyed by `ResourceKind::as_str`.
    pub kinds: BTreeMap<String, usize>,
    pub bytes_written: u64,
    pub pages_from_disk: usize,
    pub hosts: Vec<HostSection>,
    pub failures: Vec<FailureEntry>,
}

impl MirrorReport {
    pub fn from_results(
        seeds: &[String],
        root: &Path,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: &[MirrorResult],
    ) -> Self {
        let mut outcomes = OutcomeCounts::default();
        let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_host: BTreeMap<String, Vec<HostEntry>> = BTreeMap::new();
        let mut failures = Vec::new();
        let mut bytes_written = 0;
        let mut pages_from_disk = 0;

        for result in results {
            outcomes.record(result.outcome);
            bytes_written += result.bytes;
            if result.from_disk {
                pages_from_disk += 1;
            }
            if let Some(kind) = result.kind {
                *kinds.entry(kind.as_str().to_string()).or_default() += 1;
            }
            if result.outcome == Outcome::Failed {
                failures.push(FailureEntry {
                    url: result.url.clone(),
                    status: result.status,
                    error: result.error.clone().unwrap_or_else(|| "unknown error".to_string()),
                });
            }

            // Links without a host (mailto:, malformed) are counted but not listed
            if let Ok(url) = Url::parse(&result.url)
                && let Some(host) = url.host_str()
            {
                let host = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                by_host.entry(host).or_default().push(HostEntry {
                    url: result.url.clone(),
                    path: extract_url_path(&result.url),
                    kind: result.kind,
                    outcome: result.outcome,
                    status: result.status,
                    local_path: result.local_path.clone(),
                    bytes: result.bytes,
                });
            }
        }

        let hosts = by_host
            .into_iter()
            .map(|(host, entries)| HostSection { host, entries })
            .collect();

        Self {
            seeds: seeds.to_vec(),
            root: root.to_path_buf(),
            started_at,
            finished_at,
            outcomes,
            kinds,
            bytes_written,
            pages_from_disk,
            hosts,
            failures,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    fn format_targets(&self) -> String {
        match self.seeds.as_slice() {
            [] => "none".to_string(),
            [single] => single.clone(),
            many => format!("{} sites", many.len()),
        }
    }
}

/// Render `report` in the requested format.
pub fn render_report(report: &MirrorReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

pub fn generate_text_report(report: &MirrorReport) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str("                           SITEDOWN MIRROR REPORT\n");
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str(&format!("Targets:      {}\n", report.format_targets()));
    out.push_str(&format!("Mirror root:  {}\n", report.root.display()));
    out.push_str(&format!("Started:      {}\n", format_timestamp(&report.started_at)));
    out.push_str(&format!("Duration:     {} seconds\n\n", report.duration_seconds()));

    out.push_str(RULE);
    out.push('\n');
    out.push_str("SUMMARY\n");
    out.push_str(RULE);
    out.push_str("\n\n");

    let counts = &report.outcomes;
    out.push_str(&format!("Total URLs:   {}\n\n", counts.total()));
    out.push_str(&format!("  {}          {}\n", "[SAVED]".green().bold(), counts.saved));
    out.push_str(&format!("  {}       {}\n", "[EXISTING]".cyan().bold(), counts.skipped_existing));
    out.push_str(&format!("  {}        {}\n", "[SKIPPED]".bright_black().bold(), counts.skipped));
    out.push_str(&format!("  {}         {}\n", "[FAILED]".red().bold(), counts.failed));
    out.push('\n');
    out.push_str(&format!("Bytes written:    {}\n", format_bytes(report.bytes_written)));
    out.push_str(&format!("Pages from disk:  {}\n\n", report.pages_from_disk));

    if !report.kinds.is_empty() {
        out.push_str("By kind:\n");
        for (kind, count) in &report.kinds {
            out.push_str(&format!("  {:<10} {}\n", kind, count));
        }
        out.push('\n');
    }

    for section in &report.hosts {
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!("{}\n", section.host.bright_white().bold()));
        out.push_str(RULE);
        out.push_str("\n\n");

        for entry in &section.entries {
            let line = format!(
                "  {} {}",
                colorize_outcome(entry.outcome),
                entry.path
            );
            out.push_str(&line);
            if let Some(status) = entry.status
                && entry.outcome == Outcome::Failed
            {
                out.push_str(&format!(" {}", colorize_status(status)));
            }
            if let Some(kind) = entry.kind
                && kind != ResourceKind::Html
            {
                out.push_str(&format!(" {}", kind.as_str().bright_black()));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !report.failures.is_empty() {
        out.push_str(RULE);
        out.push('\n');
        out.push_str("FAILURES\n");
        out.push_str(RULE);
        out.push_str("\n\n");
        for (idx, failure) in report.failures.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", idx + 1, failure.url));
            out.push_str(&format!("    {}\n", failure.error.red()));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push('\n');
    out.push_str("                               End of Report\n");
    out.push_str(RULE);
    out.push('\n');

    out
}

pub fn generate_json_report(report: &MirrorReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Sitedown",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "seeds": report.seeds,
                "root": report.root,
                "start_time": report.started_at.to_rfc3339(),
                "end_time": report.finished_at.to_rfc3339(),
                "duration_seconds": report.duration_seconds()
            },
            "summary": {
                "total_urls": report.outcomes.total(),
                "outcomes": report.outcomes,
                "kinds": report.kinds,
                "bytes_written": report.bytes_written,
                "pages_from_disk": report.pages_from_disk
            },
            "hosts": report.hosts,
            "failures": report.failures
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(report: &MirrorReport) -> String {
    let mut out = String::new();

    out.push_str("# Sitedown Mirror Report\n\n");
    out.push_str(&format!("- **Targets:** {}\n", report.format_targets()));
    out.push_str(&format!("- **Mirror root:** `{}`\n", report.root.display()));
    out.push_str(&format!("- **Started:** {}\n", format_timestamp(&report.started_at)));
    out.push_str(&format!("- **Duration:** {} seconds\n\n", report.duration_seconds()));

    out.push_str("## Summary\n\n");
    out.push_str("| Outcome | Count |\n|---|---|\n");
    out.push_str(&format!("| saved | {} |\n", report.outcomes.saved));
    out.push_str(&format!("| skipped_existing | {} |\n", report.outcomes.skipped_existing));
    out.push_str(&format!("| skipped | {} |\n", report.outcomes.skipped));
    out.push_str(&format!("| failed | {} |\n\n", report.outcomes.failed));
    out.push_str(&format!("Bytes written: {}\n\n", format_bytes(report.bytes_written)));

    if !report.kinds.is_empty() {
        out.push_str("| Kind | Count |\n|---|---|\n");
        for (kind, count) in &report.kinds {
            out.push_str(&format!("| {} | {} |\n", kind, count));
        }
        out.push('\n');
    }

    for section in &report.hosts {
        out.push_str(&format!("## {}\n\n", section.host));
        out.push_str("| Path | Kind | Outcome | Local file |\n|---|---|---|---|\n");
        for entry in &section.entries {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                escape_cell(&entry.path),
                entry.kind.map(|k| k.as_str()).unwrap_or("-"),
                entry.outcome,
                entry
                    .local_path
                    .as_ref()
                    .map(|p| format!("`{}`", escape_cell(&p.display().to_string())))
                    .unwrap_or_else(|| "-".to_string())
            ));
        }
        out.push('\n');
    }

    if !report.failures.is_empty() {
        out.push_str("## Failures\n\n");
        for failure in &report.failures {
            out.push_str(&format!("- `{}`: {}\n", failure.url, failure.error));
        }
        out.push('\n');
    }

    out
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

// Helper functions

fn colorize_outcome(outcome: Outcome) -> String {
    let label = format!("{:<16}", outcome.as_str());
    match outcome {
        Outcome::Saved => label.green().to_string(),
        Outcome::SkippedExisting => label.cyan().to_string(),
        Outcome::Failed => label.red().to_string(),
        Outcome::Skipped => label.bright_black().to_string(),
    }
}

fn colorize_status(status: u16) -> String {
    let text = status.to_string();
    match status {
        200..=299 => text.green().to_string(),
        300..=399 => text.cyan().to_string(),
        400..=499 => text.yellow().to_string(),
        500..=599 => text.red().to_string(),
        _ => text,
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
