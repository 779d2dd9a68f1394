//! Language-specific lexical features that affect literal parsing:
//! - Integer type suffixes (Java: `L`)
//! - Number format prefixes (0x, 0o, 0b, Java leading-zero octal)
//! - String prefixes and quoting (Python: r"", b"", triple quotes)

use super::Language;

pub fn strip_int_suffix(text: &str, language: Language) -> &str {
    match language {
        Language::Java => text
            .strip_suffix('L')
            .or_else(|| text.strip_suffix('l'))
            .unwrap_or(text),
        Language::Python => text,
    }
}

pub fn parse_int_literal(text: &str, language: Language) -> Option<i64> {
    let text = text.trim().replace('_', "");
    let text = strip_int_suffix(&text, language);

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else if language == Language::Java && text.starts_with('0') && text.len() > 1 {
        i64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Strip quotes (and Python string prefixes) from a string literal's text.
pub fn unquote_string(text: &str, language: Language) -> String {
    let text = text.trim();
    let text = match language {
        Language::Python => text.trim_start_matches(|c: char| "rRbBuUfF".contains(c)),
        Language::Java => text,
    };

    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if text.len() >= 2 * quote.len() && text.starts_with(quote) && text.ends_with(quote) {
            return text[quote.len()..text.len() - quote.len()].to_string();
        }
    }
    text.to_string()
}

pub fn is_bytes_literal(text: &str) -> bool {
    text.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .any(|c| c == 'b' || c == 'B')
}
