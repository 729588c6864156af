use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::ProcessedKey;

pub const LOG_FILE_NAME: &str = "last_processed_files.log";

/// Append-only record of `<issuer>:<filename>` keys already merged.
///
/// Entries are never removed, so a corrected statement saved under the same
/// name is not picked up again.
pub struct ProcessedLog {
    path: PathBuf,
    entries: HashSet<String>,
}

impl ProcessedLog {
    pub fn path_in(out_dir: &Path) -> PathBuf {
        out_dir.join(LOG_FILE_NAME)
    }

    /// Read the whole log. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            std::fs::read_to_string(path)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            HashSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn contains(&self, key: &ProcessedKey) -> bool {
        self.entries.contains(&key.to_string())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn append(&mut self, keys: &[ProcessedKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for key in keys {
            writeln!(file, "{key}")?;
            self.entries.insert(key.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Issuer;

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ProcessedLog::load(&ProcessedLog::path_in(dir.path())).unwrap();
        assert_eq!(log.len(), 0);
        assert!(!log.contains(&ProcessedKey::new(Issuer::Sbi, "01_2024.pdf")));
    }

    #[test]
    fn test_append_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = ProcessedLog::path_in(&dir.path().join("excel"));
        let mut log = ProcessedLog::load(&path).unwrap();
        log.append(&[
            ProcessedKey::new(Issuer::Sbi, "01_2024.pdf"),
            ProcessedKey::new(Issuer::Hdfc, "01_2024.PDF"),
        ])
        .unwrap();
        assert!(log.contains(&ProcessedKey::new(Issuer::Sbi, "01_2024.pdf")));

        let reloaded = ProcessedLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&ProcessedKey::new(Issuer::Hdfc, "01_2024.PDF")));
        assert!(!reloaded.contains(&ProcessedKey::new(Issuer::Hdfc, "01_2024.pdf")));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "sbi:01_2024.pdf\nhdfc:01_2024.PDF\n"
        );
    }

    #[test]
    fn test_duplicates_and_blank_lines_are_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        std::fs::write(&path, "icici:02_2024.pdf\n\nicici:02_2024.pdf\n  \n").unwrap();
        let log = ProcessedLog::load(&path).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.contains(&ProcessedKey::new(Issuer::Icici, "02_2024.pdf")));
    }
}
