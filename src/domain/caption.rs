use serde::{Deserialize, Serialize};

/// A single caption line with timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionEntry {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// An ordered caption sequence for one job. Construction validates the
/// timing invariants: every entry has `0 <= start < end` and non-empty
/// text, entries are sorted by `start`, and no two entries overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack(Vec<CaptionEntry>);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaptionError {
    #[error("caption {index} has empty text")]
    EmptyText { index: usize },
    #[error("caption {index} has invalid timing: start {start}, end {end}")]
    InvalidTiming { index: usize, start: f64, end: f64 },
    #[error("caption {index} overlaps the previous entry")]
    Overlap { index: usize },
}

impl CaptionTrack {
    pub fn new(entries: Vec<CaptionEntry>) -> Result<Self, CaptionError> {
        for (index, entry) in entries.iter().enumerate() {
            if entry.text.trim().is_empty() {
                return Err(CaptionError::EmptyText { index });
            }
            if entry.start < 0.0 || entry.end <= entry.start {
                return Err(CaptionError::InvalidTiming {
                    index,
                    start: entry.start,
                    end: entry.end,
                });
            }
            if index > 0 {
                let prev = &entries[index - 1];
                if entry.start < prev.end {
                    return Err(CaptionError::Overlap { index });
                }
            }
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
