//! Row filter for statements extracted as table regions.
//!
//! Regions are first flattened into a dump whose leading column is the row's
//! position inside its region. Transaction rows are the ones whose second dump
//! column holds a `DD/MM/YYYY HH:MM:SS` timestamp; columns 2, 3 and 5 of those
//! rows are the date, description and amount.

use std::sync::OnceLock;

use regex::Regex;

use crate::formats::ScanReport;
use crate::models::{RawRecord, TableRegion};

const MATCH_COLUMN: usize = 1;
const DATE_COLUMN: usize = 1;
const DESCRIPTION_COLUMN: usize = 2;
const AMOUNT_COLUMN: usize = 4;

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4} [0-9]{2}:[0-9]{2}:[0-9]{2}").unwrap()
    })
}

/// Flatten regions into dump rows: `[row index, cell, cell, ...]`.
pub fn dump_rows(regions: &[TableRegion]) -> Vec<Vec<String>> {
    regions
        .iter()
        .flat_map(|region| {
            region.rows.iter().enumerate().map(|(i, row)| {
                let mut out = Vec::with_capacity(row.len() + 1);
                out.push(i.to_string());
                out.extend(row.iter().cloned());
                out
            })
        })
        .collect()
}

pub fn filter(regions: &[TableRegion]) -> ScanReport {
    let cell = |row: &[String], idx: usize| row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();

    let records = dump_rows(regions)
        .into_iter()
        .filter(|row| row.get(MATCH_COLUMN).is_some_and(|c| timestamp_re().is_match(c)))
        .map(|row| RawRecord {
            date: cell(&row, DATE_COLUMN),
            description: cell(&row, DESCRIPTION_COLUMN),
            amount_text: cell(&row, AMOUNT_COLUMN),
            card: None,
            kind: None,
        })
        .collect();

    ScanReport {
        records,
        diagnostics: Vec::new(),
    }
}
