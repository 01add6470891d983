//! Directory scanner for system ROM folders.
//!
//! Walks a system folder recursively and returns every file whose extension
//! is in the configured set, skipping the descriptor store and any media
//! folders so previously downloaded artwork is never mistaken for a ROM.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Build a lowercase extension set from a list like `["zip", "SFC"]`.
pub fn extension_set<S: AsRef<str>>(extensions: &[S]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
        .collect()
}

/// Scan a system folder for ROM files, sorted by path.
///
/// Directories whose name is in `skip_dirs` (e.g. the media folder) and
/// hidden entries are not descended into.
pub fn scan_rom_files(
    folder: &Path,
    extensions: &HashSet<String>,
    skip_dirs: &[&str],
) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(folder, extensions, skip_dirs, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(
    dir: &Path,
    extensions: &HashSet<String>,
    skip_dirs: &[&str],
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            if !skip_dirs.iter().any(|d| *d == name) {
                collect(&path, extensions, skip_dirs, out)?;
            }
        } else if path.is_file() && has_matching_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

/// Check if a path has an extension in the allowed set.
fn has_matching_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_nested_roms_and_skips_media() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join("downloaded_images")).unwrap();
        std::fs::write(root.join("b.zip"), b"").unwrap();
        std::fs::write(root.join("a.SFC"), b"").unwrap();
        std::fs::write(root.join("sub").join("c.zip"), b"").unwrap();
        std::fs::write(root.join("gamelist.xml"), b"").unwrap();
        std::fs::write(root.join("downloaded_images").join("x.zip"), b"").unwrap();
        std::fs::write(root.join(".hidden.zip"), b"").unwrap();

        let exts = extension_set(&["zip", ".sfc"]);
        let found = scan_rom_files(root, &exts, &["downloaded_images"]).unwrap();
        assert_eq!(
            found,
            vec![
                root.join("a.SFC"),
                root.join("b.zip"),
                root.join("sub").join("c.zip"),
            ]
        );
    }
}
