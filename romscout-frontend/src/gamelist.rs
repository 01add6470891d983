//! ES-DE `gamelist.xml` descriptor store.
//!
//! The whole document is read into memory, edited, and written back in one
//! piece. Elements and attributes this crate does not model are carried
//! through unchanged so frontend bookkeeping (play counts, favorites,
//! ratings, alternative emulator choices) survives a rewrite.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::{FrontendError, GameMetadata, MediaSlot};

/// File name of the descriptor store inside a system folder.
pub const GAMELIST_FILE: &str = "gamelist.xml";

/// One `<game>` (or `<folder>`) entry, keyed by its ROM path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRecord {
    /// Library-relative ROM path, e.g. `./Sonic (USA).zip`
    pub path: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub players: Option<String>,
    pub release_date: Option<String>,
    /// Stored media path per slot, exactly as it appears in the file
    pub media: BTreeMap<MediaSlot, String>,
    /// Attributes of the entry element other than `path`
    pub attributes: Vec<(String, String)>,
    /// Child elements not modelled above, in document order
    pub extra: Vec<(String, String)>,
    /// Unmodelled child elements with nested markup, as raw XML
    pub fragments: Vec<String>,
    /// The ROM path was a `<path>` child rather than an attribute
    pub path_element: bool,
}

impl GameRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Whether the record carries a non-empty display name.
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Stored media path for a slot, ignoring blank entries.
    pub fn media_path(&self, slot: MediaSlot) -> Option<&str> {
        self.media
            .get(&slot)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }

    /// Overwrite the descriptive fields. `None` fields leave the old value.
    pub fn apply_metadata(&mut self, meta: &GameMetadata) {
        self.name = Some(meta.name.clone());
        set_if_some(&mut self.description, &meta.description);
        set_if_some(&mut self.developer, &meta.developer);
        set_if_some(&mut self.publisher, &meta.publisher);
        set_if_some(&mut self.genre, &meta.genre);
        set_if_some(&mut self.players, &meta.players);
        set_if_some(&mut self.release_date, &meta.release_date);
    }

    fn set_field(&mut self, tag: &str, value: String) {
        let value = Some(value).filter(|v| !v.is_empty());
        match tag {
            "name" => self.name = value,
            "desc" => self.description = value,
            "developer" => self.developer = value,
            "publisher" => self.publisher = value,
            "genre" => self.genre = value,
            "players" => self.players = value,
            "releasedate" => self.release_date = value,
            "path" if self.path.is_empty() => {
                self.path = value.unwrap_or_default();
                self.path_element = true;
            }
            other => match MediaSlot::from_tag(other) {
                Some(slot) => {
                    if let Some(v) = value {
                        self.media.insert(slot, v);
                    }
                }
                None => self.extra.push((other.to_string(), value.unwrap_or_default())),
            },
        }
    }
}

fn set_if_some(field: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
        *field = Some(v.clone());
    }
}

/// The parsed contents of one `gamelist.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameList {
    pub games: Vec<GameRecord>,
    pub folders: Vec<GameRecord>,
    /// Other children of `<gameList>` (e.g. `<alternativeEmulator>`), as raw XML
    pub other: Vec<String>,
}

impl GameList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a descriptor store, returning an empty one if the file is absent.
    pub fn load(path: &Path) -> Result<Self, FrontendError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a descriptor store from XML text.
    pub fn parse(text: &str) -> Result<Self, FrontendError> {
        let mut xml = Reader::from_str(text);
        xml.config_mut().trim_text(true);

        let mut list = GameList::new();
        let mut saw_root = false;
        // (is_folder, record)
        let mut current: Option<(bool, GameRecord)> = None;
        let mut field: Option<OpenField> = None;
        // Unmodelled child of <gameList> being copied
        let mut other: Option<RawElement> = None;

        loop {
            let event = xml.read_event()?;
            if matches!(event, Event::Eof) {
                break;
            }

            if let Some(raw) = other.as_mut() {
                raw.push(&event)?;
                if raw.is_closed() {
                    if let Some(raw) = other.take() {
                        list.other.push(raw.into_string());
                    }
                }
                continue;
            }

            if let Some(open) = field.as_mut() {
                open.push(&event)?;
                if open.raw.is_closed() {
                    if let (Some(open), Some((_, record))) = (field.take(), current.as_mut()) {
                        open.finish(record);
                    }
                }
                continue;
            }

            match &event {
                Event::Start(e) => {
                    let tag = tag_name(e);
                    if current.is_some() {
                        field = Some(OpenField::new(tag, &event)?);
                        continue;
                    }
                    match tag.as_str() {
                        "gameList" => saw_root = true,
                        "game" | "folder" => {
                            current = Some((tag == "folder", record_from_start(e)?));
                        }
                        _ if saw_root => other = Some(RawElement::open(&event)?),
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    let tag = tag_name(e);
                    match current.as_mut() {
                        Some((_, record)) => record.set_field(&tag, String::new()),
                        None if tag == "game" || tag == "folder" => {
                            let record = record_from_start(e)?;
                            push_record(&mut list, tag == "folder", record);
                        }
                        None if tag == "gameList" => saw_root = true,
                        None if saw_root => {
                            list.other.push(RawElement::open(&event)?.into_string());
                        }
                        None => {}
                    }
                }
                Event::End(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag == "game" || tag == "folder" {
                        if let Some((is_folder, record)) = current.take() {
                            push_record(&mut list, is_folder, record);
                        }
                    }
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(FrontendError::invalid_gamelist("missing <gameList> root element"));
        }
        Ok(list)
    }

    /// Find a game record by ROM path.
    pub fn find(&self, rom_path: &str) -> Option<&GameRecord> {
        self.games.iter().find(|g| g.path == rom_path)
    }

    pub fn find_mut(&mut self, rom_path: &str) -> Option<&mut GameRecord> {
        self.games.iter_mut().find(|g| g.path == rom_path)
    }

    /// Replace the record with the same path, or append it. An appended
    /// record takes the path form (`<path>` child or attribute) of the
    /// entries already in the file.
    pub fn upsert(&mut self, mut record: GameRecord) {
        let path_element = self.games.first().map(|g| g.path_element);
        match self.find_mut(&record.path) {
            Some(existing) => *existing = record,
            None => {
                if let Some(path_element) = path_element {
                    record.path_element = path_element;
                }
                self.games.push(record);
            }
        }
    }

    /// Render the store as XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str("<gameList>\n");
        for raw in &self.other {
            xml.push_str("  ");
            xml.push_str(raw);
            xml.push('\n');
        }
        for folder in &self.folders {
            write_record(&mut xml, "folder", folder);
        }
        for game in &self.games {
            write_record(&mut xml, "game", game);
        }
        xml.push_str("</gameList>\n");
        xml
    }

    /// Write the whole store, creating parent directories as needed.
    /// The file is replaced atomically (write to temp, then rename).
    pub fn save(&self, path: &Path) -> Result<(), FrontendError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("xml.tmp");
        fs::write(&tmp, self.to_xml())?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn push_record(list: &mut GameList, is_folder: bool, record: GameRecord) {
    if is_folder {
        list.folders.push(record);
    } else if let Some(existing) = list.find_mut(&record.path) {
        // Paths are unique keys; a later duplicate replaces the earlier entry in place
        log::warn!("Duplicate gamelist entry for {}, keeping the last one", record.path);
        *existing = record;
    } else {
        list.games.push(record);
    }
}

/// Verbatim copy of one element subtree.
struct RawElement {
    writer: Writer<Vec<u8>>,
    depth: usize,
}

impl RawElement {
    /// Start copying at a `Start` or `Empty` event.
    fn open(event: &Event<'_>) -> Result<Self, FrontendError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(event.borrow())?;
        let depth = usize::from(matches!(event, Event::Start(_)));
        Ok(Self { writer, depth })
    }

    fn push(&mut self, event: &Event<'_>) -> Result<(), FrontendError> {
        match event {
            Event::Start(_) => self.depth += 1,
            Event::End(_) => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.writer.write_event(event.borrow())?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.depth == 0
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.writer.into_inner()).into_owned()
    }
}

/// A child element of a `<game>` being read.
struct OpenField {
    tag: String,
    text: String,
    raw: RawElement,
    has_children: bool,
}

impl OpenField {
    fn new(tag: String, start: &Event<'_>) -> Result<Self, FrontendError> {
        Ok(Self {
            tag,
            text: String::new(),
            raw: RawElement::open(start)?,
            has_children: false,
        })
    }

    fn push(&mut self, event: &Event<'_>) -> Result<(), FrontendError> {
        let direct = self.raw.depth == 1;
        match event {
            Event::Start(_) | Event::Empty(_) => self.has_children = true,
            Event::Text(e) if direct => self.text.push_str(&e.unescape()?),
            Event::CData(e) if direct => self.text.push_str(&String::from_utf8_lossy(e.as_ref())),
            _ => {}
        }
        self.raw.push(event)
    }

    fn finish(self, record: &mut GameRecord) {
        if self.has_children && !is_modelled(&self.tag) {
            record.fragments.push(self.raw.into_string());
        } else {
            record.set_field(&self.tag, self.text.trim().to_string());
        }
    }
}

fn is_modelled(tag: &str) -> bool {
    matches!(
        tag,
        "path" | "name" | "desc" | "developer" | "publisher" | "genre" | "players" | "releasedate"
    ) || MediaSlot::from_tag(tag).is_some()
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn record_from_start(e: &BytesStart<'_>) -> Result<GameRecord, FrontendError> {
    let mut record = GameRecord::default();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        if key == "path" {
            record.path = value;
        } else {
            record.attributes.push((key, value));
        }
    }
    Ok(record)
}

fn write_record(xml: &mut String, element: &str, record: &GameRecord) {
    xml.push_str("  <");
    xml.push_str(element);
    if !record.path.is_empty() && !record.path_element {
        xml.push_str(" path=\"");
        xml.push_str(&escape_xml(&record.path));
        xml.push('"');
    }
    for (key, value) in &record.attributes {
        xml.push(' ');
        xml.push_str(key);
        xml.push_str("=\"");
        xml.push_str(&escape_xml(value));
        xml.push('"');
    }
    xml.push_str(">\n");

    if record.path_element {
        write_tag(xml, "path", &record.path);
    }
    write_opt(xml, "name", &record.name);
    write_opt(xml, "desc", &record.description);
    for slot in MediaSlot::ALL {
        if let Some(path) = record.media.get(&slot) {
            write_tag(xml, slot.tag(), path);
        }
    }
    write_opt(xml, "releasedate", &record.release_date);
    write_opt(xml, "developer", &record.developer);
    write_opt(xml, "publisher", &record.publisher);
    write_opt(xml, "genre", &record.genre);
    write_opt(xml, "players", &record.players);
    for (tag, value) in &record.extra {
        write_tag(xml, tag, value);
    }
    for raw in &record.fragments {
        xml.push_str("    ");
        xml.push_str(raw);
        xml.push('\n');
    }

    xml.push_str("  </");
    xml.push_str(element);
    xml.push_str(">\n");
}

fn write_opt(xml: &mut String, tag: &str, value: &Option<String>) {
    if let Some(v) = value {
        write_tag(xml, tag, v);
    }
}

fn write_tag(xml: &mut String, tag: &str, value: &str) {
    xml.push_str("    <");
    xml.push_str(tag);
    xml.push('>');
    xml.push_str(&escape_xml(value));
    xml.push_str("</");
    xml.push_str(tag);
    xml.push_str(">\n");
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[path = "tests/gamelist_tests.rs"]
mod tests;
