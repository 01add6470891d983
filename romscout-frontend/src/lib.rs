pub mod error;
pub mod gamelist;
pub mod inventory;
pub mod media_types;
pub mod store;

pub use error::FrontendError;
pub use gamelist::{GAMELIST_FILE, GameList, GameRecord};
pub use inventory::{InventoryEntry, SlotStatus, inventory};
pub use media_types::MediaSlot;
pub use store::{
    MediaLayout, MergeMode, RecordUpdate, SkipDecision, ensure_named, is_stock_path, merge,
    skip_decision, slot_wants_download,
};

/// Descriptive metadata for one game, as written to the descriptor store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameMetadata {
    /// Display name
    pub name: String,
    /// Game description
    pub description: Option<String>,
    /// Developer name
    pub developer: Option<String>,
    /// Publisher name
    pub publisher: Option<String>,
    /// Genre
    pub genre: Option<String>,
    /// Number of players (e.g., "1", "1-4")
    pub players: Option<String>,
    /// Release date in YYYYMMDDTHHMMSS format
    pub release_date: Option<String>,
}

impl GameMetadata {
    /// Metadata carrying only a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Convert various date formats to ES-DE's YYYYMMDDTHHMMSS format.
///
/// A bare year becomes January 1st of that year.
pub fn format_esde_date(date: &str) -> Option<String> {
    let digits: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0..=3 => None,
        4 => Some(format!("{}0101T000000", digits)),
        6 => Some(format!("{}01T000000", digits)),
        n if n >= 8 => Some(format!("{}T000000", &digits[..8])),
        _ => Some(format!("{}0101T000000", &digits[..4])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_esde_date() {
        assert_eq!(format_esde_date("1996-06-23").as_deref(), Some("19960623T000000"));
        assert_eq!(format_esde_date("19960623").as_deref(), Some("19960623T000000"));
        assert_eq!(format_esde_date("1991").as_deref(), Some("19910101T000000"));
        assert_eq!(format_esde_date("1991-07").as_deref(), Some("19910701T000000"));
        assert_eq!(format_esde_date(""), None);
    }
}
