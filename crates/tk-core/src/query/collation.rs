//! Locale-aware string comparison
//!
//! A small multi-level collation in the spirit of the Unicode Collation
//! Algorithm, enough for sorting user data in Latin scripts:
//!
//! 1. primary: letters compared case- and accent-insensitively
//! 2. secondary: unaccented before accented
//! 3. tertiary: lower-case before upper-case
//!
//! Remaining ties fall back to code point order so the comparison is total.

use std::cmp::Ordering;

/// Compare two strings for display ordering
pub fn locale_compare(left: &str, right: &str) -> Ordering {
    primary_key(left)
        .cmp(primary_key(right))
        .then_with(|| secondary_key(left).cmp(secondary_key(right)))
        .then_with(|| tertiary_key(left).cmp(tertiary_key(right)))
        .then_with(|| left.cmp(right))
}

fn primary_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(|ch| strip_diacritic(ch).to_lowercase())
}

fn secondary_key(s: &str) -> impl Iterator<Item = bool> + '_ {
    s.chars().map(|ch| strip_diacritic(ch) != ch)
}

fn tertiary_key(s: &str) -> impl Iterator<Item = bool> + '_ {
    s.chars().map(char::is_uppercase)
}

/// Map accented Latin-1 and common Latin Extended-A letters to their base letter
fn strip_diacritic(ch: char) -> char {
    let base = match ch.to_lowercase().next().unwrap_or(ch) {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'æ' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' => 'd',
        'è'..='ë' | 'ē' | 'ę' | 'ě' => 'e',
        'ì'..='ï' | 'ī' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' => 's',
        'ť' => 't',
        'ù'..='ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => return ch,
    };
    if ch.is_uppercase() {
        base.to_ascii_uppercase()
    } else {
        base
    }
}
