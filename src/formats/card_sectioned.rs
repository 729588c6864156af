//! Scanner for statements that interleave several cards in one document.
//!
//! Each card section opens with a line carrying the card identifier. Inside a
//! section a record looks like
//!
//! ```text
//! 01/02/2024          date
//! 1234567890          serial / reference number
//! STARBUCKS COFFEE    description (sometimes split over two lines)
//! 120                 reward points
//! 250.00              amount, suffixed with "Cr" for credits
//! ```

use crate::classifier::{classify, is_numeric_token, is_valid_description, LineRole};
use crate::formats::{Diagnostic, ScanReport};
use crate::models::{RawLine, RawRecord};
use crate::settings::CardMarker;

enum Step {
    Continue,
    Stop,
}

pub struct CardScanner<'a> {
    lines: &'a [RawLine],
    markers: &'a [CardMarker],
    position: usize,
    card: Option<String>,
    report: ScanReport,
}

impl<'a> CardScanner<'a> {
    pub fn new(lines: &'a [RawLine], markers: &'a [CardMarker]) -> Self {
        Self {
            lines,
            markers,
            position: 0,
            card: None,
            report: ScanReport::default(),
        }
    }

    pub fn scan(mut self) -> ScanReport {
        while self.position < self.lines.len() {
            if let Step::Stop = self.step() {
                break;
            }
        }
        self.report
    }

    fn step(&mut self) -> Step {
        match classify(&self.lines[self.position].text, self.markers) {
            LineRole::CardMarker(card) => {
                self.enter_card(card);
                Step::Continue
            }
            LineRole::DateMarker if self.card.is_some() => self.take_record(),
            _ => {
                self.skip_line();
                Step::Continue
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<&'a str> {
        self.lines.get(self.position + offset).map(|l| l.text.as_str())
    }

    fn line_number(&self) -> usize {
        self.lines[self.position].position
    }

    fn enter_card(&mut self, card: String) {
        self.card = Some(card);
        self.position += 1;
    }

    fn skip_line(&mut self) {
        self.position += 1;
    }

    fn skip_malformed(&mut self) {
        let position = self.line_number();
        self.report.diagnostics.push(Diagnostic::MalformedSpan { position });
        self.position += 1;
    }

    fn stop_truncated(&mut self) -> Step {
        let position = self.line_number();
        self.report.diagnostics.push(Diagnostic::TruncatedRecord { position });
        Step::Stop
    }

    /// Date line under a known card: read the 5-line or 6-line form.
    fn take_record(&mut self) -> Step {
        let (Some(date), Some(_serial), Some(desc1), Some(desc2)) =
            (self.peek(0), self.peek(1), self.peek(2), self.peek(3))
        else {
            return self.stop_truncated();
        };

        let (description, width) = if is_numeric_token(desc2) && is_valid_description(desc1) {
            (desc1.to_string(), 5)
        } else {
            let combined = format!("{desc1} {desc2}");
            if !is_valid_description(&combined) {
                self.skip_malformed();
                return Step::Continue;
            }
            (combined, 6)
        };

        let Some(amount) = self.peek(width - 1) else {
            return self.stop_truncated();
        };

        self.report.records.push(RawRecord {
            date: date.to_string(),
            description,
            amount_text: amount.replace(',', "").trim().to_string(),
            card: self.card.clone(),
            kind: None,
        });
        self.position += width;
        Step::Continue
    }
}
