//! Backup file names: `backup_<YYYYMMDD_HHMMSS>[_<n>].json`

use chrono::{NaiveDateTime, Timelike};

const PREFIX: &str = "backup_";
const EXTENSION: &str = ".json";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;

/// Parsed backup file name. Orders chronologically, then by suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BackupName {
    captured_at: NaiveDateTime,
    seq: u32,
}

impl BackupName {
    /// Unsuffixed name for a capture time, truncated to whole seconds
    pub fn new(captured_at: NaiveDateTime) -> Self {
        let captured_at = captured_at.with_nanosecond(0).unwrap_or(captured_at);
        Self { captured_at, seq: 0 }
    }

    /// Same capture time, next disambiguating suffix; `None` once the
    /// suffix space is exhausted
    pub fn next(self) -> Option<Self> {
        Some(Self {
            seq: self.seq.checked_add(1)?,
            ..self
        })
    }

    /// Capture time encoded in the name
    pub fn captured_at(&self) -> NaiveDateTime {
        self.captured_at
    }

    /// Collision suffix (0 when absent)
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Render the file name
    pub fn file_name(&self) -> String {
        let stamp = self.captured_at.format(STAMP_FORMAT);
        if self.seq == 0 {
            format!("{PREFIX}{stamp}{EXTENSION}")
        } else {
            format!("{PREFIX}{stamp}_{}{EXTENSION}", self.seq)
        }
    }

    /// Parse a file name; `None` if it is not a backup name.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
        let stamp = stem.get(..STAMP_LEN)?;
        let captured_at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;

        let seq = match &stem[STAMP_LEN..] {
            "" => 0,
            rest => {
                let digits = rest.strip_prefix('_')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse::<u32>().ok().filter(|&n| n > 0)?
            }
        };

        // Only canonical spellings: a lenient chrono parse must not alias
        // another file's name
        let parsed = Self { captured_at, seq };
        (parsed.file_name() == name).then_some(parsed)
    }
}
