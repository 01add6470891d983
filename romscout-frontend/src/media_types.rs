use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Media roles a descriptor record can carry. Each slot holds at most one
/// file path per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSlot {
    /// Main picture (usually an in-game screenshot)
    Image,
    /// Gameplay or promotional video
    Video,
    /// Logo / wheel image
    Marquee,
    /// Small picture, usually the box art
    Thumbnail,
}

impl MediaSlot {
    pub const ALL: [MediaSlot; 4] = [
        MediaSlot::Image,
        MediaSlot::Video,
        MediaSlot::Marquee,
        MediaSlot::Thumbnail,
    ];

    /// Element name in `gamelist.xml`.
    pub fn tag(&self) -> &'static str {
        match self {
            MediaSlot::Image => "image",
            MediaSlot::Video => "video",
            MediaSlot::Marquee => "marquee",
            MediaSlot::Thumbnail => "thumbnail",
        }
    }

    /// Suffix used in media file names: `<stem>-<suffix>.<ext>`.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            MediaSlot::Thumbnail => "thumb",
            other => other.tag(),
        }
    }

    /// File extension used when the catalog does not report a format.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaSlot::Video => "mp4",
            _ => "png",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        MediaSlot::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MediaSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaSlot::Image),
            "video" => Ok(MediaSlot::Video),
            "marquee" | "wheel" => Ok(MediaSlot::Marquee),
            "thumbnail" | "thumb" => Ok(MediaSlot::Thumbnail),
            other => Err(format!(
                "unknown media slot '{}' (expected image, video, marquee or thumbnail)",
                other
            )),
        }
    }
}
