pub mod card_sectioned;
pub mod fixed_field;
pub mod table_region;

use std::fmt;

use crate::models::{raw_lines, RawLine, RawRecord, TableRegion};
use crate::settings::{CardMarker, Settings};

/// What the PDF capability handed back for a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Pages(Vec<String>),
    Tables(Vec<TableRegion>),
}

impl Extracted {
    /// Page texts concatenated and split into trimmed, non-empty lines.
    pub fn lines(&self) -> Vec<RawLine> {
        match self {
            Self::Pages(pages) => raw_lines(&pages.join("\n")),
            Self::Tables(_) => Vec::new(),
        }
    }
}

/// Layout-specific knobs, taken from settings.
#[derive(Debug, Clone, Default)]
pub struct FormatConfig {
    pub card_markers: Vec<CardMarker>,
    pub section_header: String,
}

impl From<&Settings> for FormatConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            card_markers: settings.card_markers.clone(),
            section_header: settings.section_header.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A record started at `position` but the input ended before it was complete.
    TruncatedRecord { position: usize },
    /// A date line at `position` did not lead to a usable record.
    MalformedSpan { position: usize },
    /// Scanning stopped at the first entry whose type was not a debit.
    StoppedAtNonDebit { position: usize, kind: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedRecord { position } => {
                write!(f, "record at line {position} truncated by end of input; dropped")
            }
            Self::MalformedSpan { position } => {
                write!(f, "unrecognized record layout at line {position}; skipped")
            }
            Self::StoppedAtNonDebit { position, kind } => write!(
                f,
                "stopped at line {position} on non-debit entry type {kind:?}; later entries ignored"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub records: Vec<RawRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    /// Free text with card identifier lines splitting the document into
    /// per-card sections; records span 5 or 6 lines.
    CardSectioned,
    /// Free text with one named section of fixed 4-line records.
    FixedFieldSequential,
    /// Table regions, filtered down to rows carrying a timestamp.
    TableRegionFiltered,
}

impl StatementFormat {
    pub fn uses_tables(&self) -> bool {
        matches!(self, Self::TableRegionFiltered)
    }

    pub fn reconstruct(&self, extracted: &Extracted, config: &FormatConfig) -> ScanReport {
        match (self, extracted) {
            (Self::CardSectioned, _) => {
                card_sectioned::CardScanner::new(&extracted.lines(), &config.card_markers).scan()
            }
            (Self::FixedFieldSequential, _) => {
                fixed_field::FixedFieldScanner::new(&extracted.lines(), &config.section_header).scan()
            }
            (Self::TableRegionFiltered, Extracted::Tables(regions)) => table_region::filter(regions),
            (Self::TableRegionFiltered, Extracted::Pages(_)) => ScanReport::default(),
        }
    }
}
