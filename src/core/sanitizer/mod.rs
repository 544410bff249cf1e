//! # Sanitizer Module
//!
//! Turns arbitrary strings (EXIF device models, derived dates) into a single
//! safe folder name.
//!
//! ## Rules (applied in order)
//! 1. `.` and `..` become `Unknown`
//! 2. `< > : " / \ | ? * .` become `_`
//! 3. Control characters (code points 0-31) become `_`
//! 4. Surrounding whitespace and trailing dots are stripped
//! 5. Reserved device names (CON, PRN, AUX, NUL, COM1-9, LPT1-9) get a `_safe` suffix
//! 6. The result is cut to 100 characters
//! 7. An empty result becomes `Unknown`

/// Segment used when nothing usable is left
pub const FALLBACK_SEGMENT: &str = "Unknown";

/// Maximum length of a sanitized segment, in characters
pub const MAX_SEGMENT_LEN: usize = 100;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '.'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a single path segment.
///
/// Total: every input produces a non-empty segment without separators,
/// dots or control characters.
pub fn sanitize_segment(name: &str) -> String {
    if name == "." || name == ".." {
        return FALLBACK_SEGMENT.to_string();
    }

    let replaced: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || (c as u32) <= 31 {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut safe = replaced.trim().trim_end_matches('.').to_string();

    if is_reserved_name(&safe) {
        safe.push_str("_safe");
    }

    if safe.chars().count() > MAX_SEGMENT_LEN {
        safe = safe.chars().take(MAX_SEGMENT_LEN).collect();
    }

    if safe.is_empty() {
        return FALLBACK_SEGMENT.to_string();
    }

    safe
}

/// Case-insensitive check against the Windows reserved device names
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}
