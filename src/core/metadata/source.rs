//! Source-application detection from filename patterns.
//!
//! The table is ordered and first match wins, so a name containing both
//! `whatsapp` and `screenshot` is tagged WhatsApp.

use regex::Regex;
use std::sync::OnceLock;

/// Tag given to files that look like they came straight from a camera
pub const CAMERA_TAG: &str = "Camera";

/// Ordered (tag, lowercase keywords) table
pub const SOURCE_PATTERNS: &[(&str, &[&str])] = &[
    ("WhatsApp", &["whatsapp", "-wa", "_wa"]),
    ("Telegram", &["telegram"]),
    (
        "Screenshots",
        &[
            "screenshot",
            "ekran görüntüsü",
            "ekran goruntusu",
            "screen",
            "ekran_goruntusu",
        ],
    ),
    ("Instagram", &["instagram", "ig_"]),
    ("Twitter", &["twitter", "tw_"]),
    ("Facebook", &["facebook", "fb_"]),
    ("Snapchat", &["snapchat", "snap-"]),
    (
        "Wallpapers",
        &[
            "wallpaper",
            "duvar kağıdı",
            "duvar kagidi",
            "arkaplan",
            "duvar_kagidi",
        ],
    ),
    ("Downloads", &["download", "indir"]),
    ("Gemini AI", &["gemini", "google_ai"]),
    ("AI Generated", &["dalle", "midjourney", "stable_diffusion"]),
];

/// A detected source and the filename keyword that triggered it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMatch {
    pub tag: &'static str,
    /// Lowercase keyword, without leading/trailing separators
    pub keyword: &'static str,
}

impl SourceMatch {
    /// Whether a filename token is just the keyword (not a device name)
    pub fn is_keyword_token(&self, token: &str) -> bool {
        !self.keyword.is_empty() && token.to_lowercase().contains(self.keyword)
    }
}

/// Detect the source application tag for a filename
pub fn detect_source_app(filename: &str) -> Option<&'static str> {
    match_source(filename).map(|m| m.tag)
}

/// Detect the source application along with the keyword that matched
pub fn match_source(filename: &str) -> Option<SourceMatch> {
    let lower = filename.to_lowercase();

    for &(tag, patterns) in SOURCE_PATTERNS {
        if let Some(&pattern) = patterns.iter().find(|p| lower.contains(**p)) {
            return Some(SourceMatch {
                tag,
                keyword: pattern.trim_matches(|c| c == '_' || c == '-'),
            });
        }
    }

    let captures = camera_pattern().captures(&lower)?;
    if let Some(prefix) = captures.name("prefix") {
        let keyword = match prefix.as_str() {
            "img_" => "img",
            "photo_" => "photo",
            _ => "dsc",
        };
        return Some(SourceMatch {
            tag: CAMERA_TAG,
            keyword,
        });
    }

    // Year-like prefix ("20210615_103000.jpg"); needs more than 8 characters
    if lower.chars().count() > 8 {
        return Some(SourceMatch {
            tag: CAMERA_TAG,
            keyword: "20",
        });
    }

    None
}

fn camera_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?P<prefix>img_|photo_|dsc)|20\d{2})").expect("camera pattern is valid")
    })
}
