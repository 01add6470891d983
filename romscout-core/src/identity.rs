use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::util;

const CHUNK_SIZE: usize = 1024 * 1024; // 1 MB

/// Extensions of container formats that carry no stable binary identity.
/// Hash lookups are never attempted for these.
pub const HASH_EXCLUDED_EXTENSIONS: &[&str] = &["daphne", "singe"];

/// Identity of a single ROM within a system library.
///
/// Built once from a file and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomIdentity {
    /// Path as stored in the descriptor store, e.g. `./Sonic (USA).zip`
    pub rom_path: String,
    /// File name without extension, used for lookups and media naming
    pub stem: String,
    /// File name with extension
    pub file_name: String,
    /// Lowercase SHA-1 of the file contents, when it was computed
    pub sha1: Option<String>,
}

impl RomIdentity {
    /// Build an identity from a library-relative path without touching the disk.
    pub fn from_library_path(rom_path: &str) -> Self {
        let normalized = util::normalize_library_path(rom_path);
        let file_name = normalized
            .rsplit('/')
            .next()
            .unwrap_or(normalized.as_str())
            .to_string();
        let stem = util::file_stem_str(&file_name).to_string();
        Self {
            rom_path: normalized,
            stem,
            file_name,
            sha1: None,
        }
    }

    /// Build an identity for a file on disk, hashing it unless its extension
    /// is excluded from hash lookups or the file does not exist.
    pub fn from_file(system_dir: &Path, file: &Path) -> std::io::Result<Self> {
        let rom_path = util::library_relative_path(system_dir, file);
        let mut identity = Self::from_library_path(&rom_path);
        if file.is_file() && !identity.is_hash_excluded() {
            identity.sha1 = Some(sha1_file(file)?);
        }
        Ok(identity)
    }

    /// Lowercase extension of the ROM file, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Whether this ROM's container format is excluded from hash lookups.
    pub fn is_hash_excluded(&self) -> bool {
        self.extension()
            .map(|ext| HASH_EXCLUDED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Compute the lowercase hex SHA-1 of everything readable from `reader`.
pub fn sha1_reader(reader: &mut dyn Read) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the lowercase hex SHA-1 of a file.
pub fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    sha1_reader(&mut file)
}
