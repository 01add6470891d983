//! Library folder name to ScreenScraper system id.
//!
//! Loaded from a JSON object such as `{"snes": 4, "megadrive": "1"}`.
//! Folders absent from the mapping cannot be searched by name.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::ScrapeError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemMapping {
    ids: HashMap<String, String>,
}

impl SystemMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the mapping from a JSON file. A missing file yields an empty
    /// mapping (hash lookups still work).
    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        if !path.exists() {
            log::warn!(
                "System mapping {} not found; name searches are disabled",
                path.display()
            );
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScrapeError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(entries) = value else {
            return Err(ScrapeError::Config(
                "systems file must be a JSON object of folder name to system id".to_string(),
            ));
        };

        let mut ids = HashMap::new();
        for (system, id) in entries {
            let id = match id {
                Value::Number(n) => n.to_string(),
                Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                other => {
                    log::warn!("Ignoring system '{}' with unusable id {}", system, other);
                    continue;
                }
            };
            ids.insert(system, id);
        }
        Ok(Self { ids })
    }

    /// Catalog system id for a library folder name.
    pub fn system_id(&self, system: &str) -> Option<&str> {
        self.ids
            .get(system)
            .or_else(|| self.ids.get(&system.to_lowercase()))
            .map(String::as_str)
    }

    pub fn insert(&mut self, system: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(system.into(), id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_strings() {
        let map = SystemMapping::from_json(r#"{"snes": 4, "megadrive": "1", "bad": null}"#).unwrap();
        assert_eq!(map.system_id("snes"), Some("4"));
        assert_eq!(map.system_id("megadrive"), Some("1"));
        assert_eq!(map.system_id("SNES"), Some("4"));
        assert_eq!(map.system_id("bad"), None);
        assert_eq!(map.system_id("unknown"), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(SystemMapping::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = SystemMapping::load(&dir.path().join("systems.json")).unwrap();
        assert!(map.is_empty());
    }
}
