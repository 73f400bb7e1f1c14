//! Identifier rules shared by the backends.
//!
//! Entity names coming out of the model are source-faithful (`Root_user_id`
//! keeps whatever case the JSON keys had). Backends only ever turn them into
//! identifiers through these helpers, so two backends never disagree on how a
//! given entity or field is spelled in their own conventions.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Case convention of generated field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// Keep the key, only replacing characters an identifier cannot hold.
    Preserve,
    Pascal,
    Camel,
    Snake,
}

/// How a target spells an identifier that collides with one of its keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Prefix(&'static str),
    /// Wrap in the given quote, e.g. backticks.
    Wrap(&'static str),
    Suffix(&'static str),
}

pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Replace every character outside `[A-Za-z0-9_]` with `_` and make sure the
/// result does not start with a digit.
pub fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Type identifier for an entity or enum: the sanitized qualified name with
/// its first letter upper-cased (`Root_address` stays `Root_address`,
/// `user_profile` becomes `User_profile`).
pub fn type_ident(name: &str) -> String {
    let mut out = sanitize(name);
    if let Some(first) = out.get(..1) {
        let upper = first.to_ascii_uppercase();
        out.replace_range(..1, &upper);
    }
    out
}

/// Split a key into words at separators and lower-to-upper transitions.
fn words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in raw.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn convert(raw: &str, case: Case) -> String {
    let converted = match case {
        Case::Preserve => raw.to_string(),
        Case::Pascal => words(raw).iter().map(|w| capitalize(w)).collect(),
        Case::Camel => words(raw)
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_ascii_lowercase() } else { capitalize(w) })
            .collect(),
        Case::Snake => words(raw)
            .iter()
            .map(|w| w.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
    };
    sanitize(&converted)
}

pub fn escape_keyword(ident: String, keywords: &[&str], escape: Escape) -> String {
    if !keywords.contains(&ident.as_str()) {
        return ident;
    }
    match escape {
        Escape::Prefix(p) => format!("{p}{ident}"),
        Escape::Wrap(q) => format!("{q}{ident}{q}"),
        Escape::Suffix(s) => format!("{ident}{s}"),
    }
}

/// Make every identifier in a scope distinct by appending `_2`, `_3`, ... to
/// later duplicates.
pub fn unique<I>(idents: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut taken = HashSet::<String>::new();
    let mut out = Vec::new();
    for ident in idents {
        let mut candidate = ident.clone();
        let mut n = 1;
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{ident}_{n}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Double-quoted string literal with JSON escapes, valid in most C-family
/// targets.
pub fn quoted(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Collapse a description onto one line for use inside a comment.
pub fn comment_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").replace("*/", "* /")
}
