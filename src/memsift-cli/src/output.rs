//! Rendering of snapshots and region listings

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use memsift::{MemoryRegion, Progress, ProgressSink, Snapshot};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize)]
struct SnapshotReport<'a> {
    regions: &'a [MemoryRegion],
    total_bytes: u64,
}

/// Human-readable listing of a snapshot, one region per line.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for region in snapshot.regions() {
        let _ = writeln!(out, "  {}", region);
    }
    let _ = write!(
        out,
        "{} regions, {} ({} bytes)",
        snapshot.len(),
        format_bytes(snapshot.size()),
        snapshot.size()
    );
    out
}

pub fn render_snapshot_json(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string_pretty(&SnapshotReport {
        regions: snapshot.regions(),
        total_bytes: snapshot.size(),
    })
    .context("Failed to serialize snapshot")
}

pub fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", render_snapshot_json(snapshot)?);
    } else {
        println!("{}", render_snapshot(snapshot));
    }
    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Shows chunk progress of a prefilter on a terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn progress(&self, progress: Progress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.processed as u64);
    }

    fn result_size(&self, bytes: u64) {
        self.bar.set_message(format!("{} changed", format_bytes(bytes)));
    }
}
