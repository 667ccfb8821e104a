//! Cell text cleanup.
//!
//! Each pass is a function `&str -> String` applied in sequence. The whole
//! sequence repeats until the value stops changing, so `normalize` is
//! idempotent. No pass lengthens its input, so the loop terminates.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Characters that render as nothing.
const INVISIBLE: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

/// Clean one raw cell or header value.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(s: &str) -> String {
    let mut next = decode_entities(s);
    next = strip_invisible(&next);
    next = strip_footnotes(&next);
    next = collapse_whitespace(&next);
    next = collapse_repeated_value(&next);
    next = collapse_repeated_words(&next);
    collapse_repeated_tokens(&next)
}

// ---------------------------------------------------------------------------
// Pass 1: HTML entity leftovers
// ---------------------------------------------------------------------------

/// Decode entities that survived parsing (usually double-escaped markup).
fn decode_entities(s: &str) -> String {
    static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"&(?:#(\d{1,7})|#[xX]([0-9a-fA-F]{1,6})|(amp|nbsp|quot|apos|lt|gt));")
            .expect("valid regex")
    });

    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("amp") => Some('&'),
                    Some("nbsp") => Some(' '),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: invisible characters
// ---------------------------------------------------------------------------

fn strip_invisible(s: &str) -> String {
    s.chars()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: footnote markers
// ---------------------------------------------------------------------------

/// Remove wiki reference markers like `[1]` or `[note 2]`.
fn strip_footnotes(s: &str) -> String {
    static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\[\s*(?:note\s+)?\d+\s*\]").expect("valid regex")
    });

    FOOTNOTE_RE.replace_all(s, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: whitespace
// ---------------------------------------------------------------------------

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Pass 5: whole value written twice ("Goku (Super)Goku (Super)")
// ---------------------------------------------------------------------------

fn collapse_repeated_value(s: &str) -> String {
    match repeated_unit(s) {
        Some(unit) => unit.trim().to_string(),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Pass 6: adjacent duplicate words or phrases ("Shiny Shiny")
// ---------------------------------------------------------------------------

fn collapse_repeated_words(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split(' ').collect();
    let mut i = 0;
    while i < tokens.len() {
        let max_len = (tokens.len() - i) / 2;
        let repeat = (1..=max_len).find(|&k| {
            let phrase = &tokens[i..i + k];
            phrase == &tokens[i + k..i + 2 * k]
                && phrase.iter().any(|t| t.chars().any(char::is_alphabetic))
        });
        match repeat {
            Some(k) => {
                tokens.drain(i + k..i + 2 * k);
            }
            None => i += 1,
        }
    }
    tokens.join(" ")
}

// ---------------------------------------------------------------------------
// Pass 7: a single token written twice ("ShinyShiny")
// ---------------------------------------------------------------------------

fn collapse_repeated_tokens(s: &str) -> String {
    s.split(' ')
        .map(|token| repeated_unit(token).unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The shortest unit `s` is an exact repetition of, if any.
///
/// A unit must hold a letter, so numbers like `"1111"` are left alone.
fn repeated_unit(s: &str) -> Option<&str> {
    let len = s.len();
    (1..=len / 2)
        .filter(|&p| len % p == 0 && s.is_char_boundary(p))
        .map(|p| &s[..p])
        .find(|unit| {
            unit.chars().any(char::is_alphabetic)
                && s.as_bytes().chunks(unit.len()).all(|c| c == unit.as_bytes())
        })
}
