//! Region listing command

use super::attach;
use crate::cli::Target;
use crate::output::format_bytes;
use anyhow::{Context, Result};
use memsift::{MapsEntry, RegionFilter};
use serde::Serialize;

#[derive(Serialize)]
struct RegionRow<'a> {
    #[serde(flatten)]
    entry: &'a MapsEntry,
    scanned: bool,
}

pub fn handle(target: &Target, filter: RegionFilter, all: bool, json: bool) -> Result<()> {
    let process = attach(target, filter)?;
    let entries = process.maps().context("Failed to read process memory map")?;
    let rows = select(&entries, filter, all);

    if json {
        let out = serde_json::to_string_pretty(&rows).context("Failed to serialize regions")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", process.info());
    println!();
    for row in &rows {
        println!("{}", format_row(row));
    }

    let scanned: u64 = rows
        .iter()
        .filter(|r| r.scanned)
        .map(|r| r.entry.size() as u64)
        .sum();
    println!();
    println!("Scannable: {}", format_bytes(scanned));

    Ok(())
}

fn select(entries: &[MapsEntry], filter: RegionFilter, all: bool) -> Vec<RegionRow<'_>> {
    entries
        .iter()
        .map(|entry| RegionRow {
            entry,
            scanned: filter.accepts(entry),
        })
        .filter(|row| all || row.scanned)
        .collect()
}

fn format_row(row: &RegionRow<'_>) -> String {
    let entry = row.entry;
    format!(
        "{} {:012x}-{:012x} {} {:>10} {}",
        if row.scanned { '*' } else { ' ' },
        entry.start,
        entry.end,
        entry.perms,
        format_bytes(entry.size() as u64),
        entry.path.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use memsift::source::parse_maps_line;

    fn entries() -> Vec<MapsEntry> {
        [
            "55d0c0a21000-55d0c0a40000 r-xp 00021000 08:01 1048602    /usr/bin/cat",
            "55d0c0c41000-55d0c0c62000 rw-p 00000000 00:00 0          [heap]",
            "7ffd1a2f0000-7ffd1a2f2000 r--p 00000000 00:00 0          [vvar]",
        ]
        .iter()
        .filter_map(|line| parse_maps_line(line))
        .collect()
    }

    #[test]
    fn test_select_filters_unless_all() {
        let entries = entries();
        let rows = select(&entries, RegionFilter::default(), false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.path.as_deref(), Some("[heap]"));

        let rows = select(&entries, RegionFilter::default(), true);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.scanned).count(), 1);
    }

    #[test]
    fn test_format_row() {
        let entries = entries();
        let rows = select(&entries, RegionFilter::default(), false);
        assert_eq!(
            format_row(&rows[0]),
            "* 55d0c0c41000-55d0c0c62000 rw-p   132.0 KB [heap]"
        );
    }

    #[test]
    fn test_json_rows_carry_scan_flag() {
        let entries = entries();
        let rows = select(&entries, RegionFilter::default(), true);
        let value = serde_json::to_value(&rows).unwrap();
        assert_eq!(value[1]["path"], "[heap]");
        assert_eq!(value[1]["scanned"], true);
        assert_eq!(value[0]["scanned"], false);
    }
}
