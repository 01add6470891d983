//! Alternate-name table: `src_romname;alt_name;src_system;dest_system`.
//!
//! Rows map a ROM file stem to another name (and optionally another system
//! folder) to search under. New rows are appended; a confirmed correction
//! rewrites the file with any older row for the same stem and system
//! replaced.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// One alternate-name row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltNameMapping {
    pub source_stem: String,
    pub alt_name: String,
    /// Folder the row applies to; `None` applies to every system
    pub source_system: Option<String>,
    /// Folder to search under instead of the ROM's own
    pub target_system: Option<String>,
}

impl AltNameMapping {
    pub fn new(
        source_stem: impl Into<String>,
        alt_name: impl Into<String>,
        source_system: Option<&str>,
        target_system: Option<&str>,
    ) -> Self {
        Self {
            source_stem: source_stem.into(),
            alt_name: alt_name.into(),
            source_system: source_system.map(str::to_lowercase),
            target_system: target_system.map(str::to_lowercase),
        }
    }

    /// Whether this row may be used for a ROM in `system`.
    pub fn applies_to(&self, system: &str) -> bool {
        self.source_system
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case(system))
    }

    /// System to search: the row's target, else the ROM's own.
    pub fn search_system<'a>(&'a self, current: &'a str) -> &'a str {
        self.target_system.as_deref().unwrap_or(current)
    }

    fn same_key(&self, other: &AltNameMapping) -> bool {
        self.source_stem == other.source_stem && self.source_system == other.source_system
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    src_romname: String,
    alt_name: String,
    #[serde(default)]
    src_system: String,
    #[serde(default)]
    dest_system: String,
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

impl From<Row> for AltNameMapping {
    fn from(row: Row) -> Self {
        Self {
            source_stem: row.src_romname,
            alt_name: row.alt_name,
            source_system: non_empty(row.src_system).map(|s| s.to_lowercase()),
            target_system: non_empty(row.dest_system).map(|s| s.to_lowercase()),
        }
    }
}

impl From<&AltNameMapping> for Row {
    fn from(m: &AltNameMapping) -> Self {
        Self {
            src_romname: m.source_stem.clone(),
            alt_name: m.alt_name.clone(),
            src_system: m.source_system.clone().unwrap_or_default(),
            dest_system: m.target_system.clone().unwrap_or_default(),
        }
    }
}

/// In-memory copy of the alternate-name table, optionally backed by a file.
#[derive(Debug, Clone, Default)]
pub struct AltNameStore {
    path: Option<PathBuf>,
    entries: Vec<AltNameMapping>,
}

impl AltNameStore {
    /// A store with no backing file; appends only update memory.
    pub fn in_memory(entries: Vec<AltNameMapping>) -> Self {
        Self {
            path: None,
            entries,
        }
    }

    /// Load the table. A missing file is an empty table; malformed rows
    /// are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            entries: Vec::new(),
        };
        if !path.exists() {
            return Ok(store);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        for (line, row) in reader.deserialize::<Row>().enumerate() {
            match row {
                Ok(row) if !row.src_romname.is_empty() && !row.alt_name.is_empty() => {
                    store.entries.push(row.into());
                }
                Ok(_) => {}
                Err(e) => log::warn!("{}: skipping row {}: {}", path.display(), line + 2, e),
            }
        }
        Ok(store)
    }

    pub fn entries(&self) -> &[AltNameMapping] {
        &self.entries
    }

    /// Rows usable for a ROM stem in `system`, in file order.
    pub fn candidates(&self, stem: &str, system: &str) -> Vec<&AltNameMapping> {
        self.entries
            .iter()
            .filter(|m| m.source_stem == stem && m.applies_to(system))
            .collect()
    }

    /// Append a row, writing the header first if the file is new or empty.
    pub fn append(&mut self, mapping: AltNameMapping) -> Result<(), ScrapeError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b';')
                .has_headers(needs_header)
                .from_writer(file);
            writer.serialize(Row::from(&mapping))?;
            writer.flush()?;
        }
        self.entries.push(mapping);
        Ok(())
    }

    /// Replace every row with the same stem and source system, then rewrite
    /// the whole file.
    pub fn supersede(&mut self, mapping: AltNameMapping) -> Result<(), ScrapeError> {
        self.entries.retain(|m| !m.same_key(&mapping));
        self.entries.push(mapping);
        self.rewrite()
    }

    fn rewrite(&self) -> Result<(), ScrapeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new().delimiter(b';').from_path(&tmp)?;
            if self.entries.is_empty() {
                writer.write_record(["src_romname", "alt_name", "src_system", "dest_system"])?;
            }
            for mapping in &self.entries {
                writer.serialize(Row::from(mapping))?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/alt_names_tests.rs"]
mod tests;
