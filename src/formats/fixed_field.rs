//! Scanner for statements with a single named section of 4-line records:
//! date, description, amount and a one-letter type (`D` for debit).

use crate::formats::{Diagnostic, ScanReport};
use crate::models::{RawLine, RawRecord};

const DEBIT: &str = "D";
const RECORD_WIDTH: usize = 4;

pub struct FixedFieldScanner<'a> {
    lines: &'a [RawLine],
    header: &'a str,
    position: usize,
    capturing: bool,
    report: ScanReport,
}

impl<'a> FixedFieldScanner<'a> {
    pub fn new(lines: &'a [RawLine], header: &'a str) -> Self {
        Self {
            lines,
            header: header.trim(),
            position: 0,
            capturing: false,
            report: ScanReport::default(),
        }
    }

    pub fn scan(mut self) -> ScanReport {
        while self.position < self.lines.len() {
            let line = self.lines[self.position].text.as_str();
            if line == self.header {
                self.open_section();
            } else if !self.capturing {
                self.position += 1;
            } else if !self.take_group() {
                break;
            }
        }
        self.report
    }

    fn open_section(&mut self) {
        self.capturing = true;
        self.position += 1;
    }

    /// Consume one 4-line group. Returns false once scanning must stop.
    fn take_group(&mut self) -> bool {
        let position = self.lines[self.position].position;
        let Some(group) = self.lines.get(self.position..self.position + RECORD_WIDTH) else {
            self.report.diagnostics.push(Diagnostic::TruncatedRecord { position });
            return false;
        };

        let kind = group[3].text.as_str();
        if kind != DEBIT {
            self.report.diagnostics.push(Diagnostic::StoppedAtNonDebit {
                position,
                kind: kind.to_string(),
            });
            return false;
        }

        self.report.records.push(RawRecord {
            date: group[0].text.clone(),
            description: group[1].text.clone(),
            amount_text: group[2].text.clone(),
            card: None,
            kind: Some(kind.to_string()),
        });
        self.position += RECORD_WIDTH;
        true
    }
}
