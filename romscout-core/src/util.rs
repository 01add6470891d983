use std::path::{Component, Path};

/// Normalize a library path to the `./a/b.ext` form used by descriptor stores.
pub fn normalize_library_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    let trimmed = forward.trim_start_matches("./").trim_start_matches('/');
    format!("./{}", trimmed)
}

/// Express `file` relative to `base` in the `./a/b.ext` form.
///
/// Falls back to the file name when `file` is not below `base`.
pub fn library_relative_path(base: &Path, file: &Path) -> String {
    let rel = match file.strip_prefix(base) {
        Ok(rel) => rel,
        Err(_) => Path::new(file.file_name().unwrap_or_default()),
    };
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("./{}", parts.join("/"))
}

/// File stem of a bare file name (`"a.b.zip"` -> `"a.b"`).
pub fn file_stem_str(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(pos) => &file_name[..pos],
    }
}
