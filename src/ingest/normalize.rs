// src/ingest/normalize.rs
//! Raw title → canonical keyword.
//!
//! A single cleaning pass decodes entities, strips tags, folds typographic
//! punctuation to ASCII, drops everything outside ASCII, collapses whitespace,
//! cuts trailing site/brand boilerplate after `" - "` / `" | "` and removes
//! noise tokens. The pass is repeated until the text stops changing, which is
//! what makes [`normalize`] idempotent.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Default minimum keyword length (chars) after cleaning.
pub const MIN_KEYWORD_LEN: usize = 6;

/// Hard cap on keyword length, applied before boilerplate cutting.
pub const MAX_KEYWORD_LEN: usize = 160;

const SEPARATORS: [&str; 2] = [" - ", " | "];

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn re_noise() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b[Rr]eview\b").expect("noise regex"))
}

/// Normalize with the default minimum length. `None` means "drop this candidate".
pub fn normalize(raw: &str) -> Option<String> {
    normalize_with(raw, MIN_KEYWORD_LEN)
}

/// Normalize and reject results shorter than `min_len` characters.
pub fn normalize_with(raw: &str, min_len: usize) -> Option<String> {
    let mut cur = clean_pass(raw);
    loop {
        let next = clean_pass(&cur);
        if next == cur {
            break;
        }
        cur = next;
    }

    if cur.len() < min_len.max(1) {
        None
    } else {
        Some(cur)
    }
}

fn clean_pass(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags
    let untagged = re_tags().replace_all(&decoded, " ");

    // 3) Fold typographic punctuation, then keep printable ASCII only
    let ascii: String = untagged
        .chars()
        .map(fold_char)
        .filter(|c| c.is_ascii() && (!c.is_ascii_control() || c.is_ascii_whitespace()))
        .take(MAX_KEYWORD_LEN)
        .collect();

    // 4) Collapse whitespace
    let collapsed = re_ws().replace_all(&ascii, " ");

    // 5) Keep the left-hand segment before any boilerplate separator
    let head = cut_at_separator(collapsed.trim());

    // 6) Noise tokens
    let denoised = re_noise().replace_all(head, "");
    re_ws().replace_all(&denoised, " ").trim().to_string()
}

fn fold_char(c: char) -> char {
    match c {
        '\u{201C}' | '\u{201D}' | '\u{00AB}' | '\u{00BB}' => '"',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{2013}' | '\u{2014}' => '-',
        '\u{00A0}' => ' ',
        other => other,
    }
}

fn cut_at_separator(s: &str) -> &str {
    let cut = SEPARATORS.iter().filter_map(|sep| s.find(sep)).min();
    match cut {
        Some(idx) => &s[..idx],
        None => s,
    }
}
