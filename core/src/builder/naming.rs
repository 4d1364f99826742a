//! # Identifier Naming
//!
//! Turns schema property and definition names into Rust identifiers and keeps them
//! unique within a model tree.

use heck::{ToPascalCase, ToSnakeCase};
use std::collections::HashSet;

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "union", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Prelude and harness names a generated type must not shadow (compared snake_case).
const RESERVED_TYPE_KEYS: &[&str] = &[
    "string", "option", "vec", "box", "result", "default", "self", "some", "none", "ok", "err",
];

/// Whether `ident` is a Rust keyword (strict, reserved or edition-specific).
pub fn is_keyword(ident: &str) -> bool {
    RUST_KEYWORDS.contains(&ident)
}

/// PascalCase type name for a raw schema name.
pub fn type_name(raw: &str) -> String {
    let cleaned: String = raw
        .to_pascal_case()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    match cleaned.chars().next() {
        None => "Unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("T{}", cleaned),
        Some(_) if cleaned == "Self" => "SelfType".to_string(),
        Some(_) => cleaned,
    }
}

/// snake_case identifier for a raw name, safe to use as a field or module name.
pub fn snake_ident(raw: &str) -> String {
    let cleaned: String = raw
        .to_snake_case()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    match cleaned.chars().next() {
        None => "field".to_string(),
        Some(c) if c.is_ascii_digit() => format!("field_{}", cleaned),
        Some(_) if is_keyword(&cleaned) => format!("{}_", cleaned),
        Some(_) => cleaned,
    }
}

/// Naive English singular, used to name the item type of an array property.
pub fn singular(raw: &str) -> String {
    for suffix in ["sses", "xes", "ches", "shes"] {
        if raw.ends_with(suffix) {
            return raw[..raw.len() - 2].to_string();
        }
    }
    if let Some(stem) = raw.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    if raw.len() > 1 && raw.ends_with('s') && !raw.ends_with("ss") {
        return raw[..raw.len() - 1].to_string();
    }
    format!("{}Item", raw)
}

/// Hands out type names that are unique per tree, also after snake_casing
/// (two types must never share a file).
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    /// Allocates `raw` as a type name, suffixing `2`, `3`, ... on collision.
    pub fn allocate(&mut self, raw: &str) -> String {
        let base = type_name(raw);
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.is_free(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.to_snake_case());
        candidate
    }

    fn is_free(&self, candidate: &str) -> bool {
        let key = candidate.to_snake_case();
        !self.used.contains(&key) && !RESERVED_TYPE_KEYS.contains(&key.as_str())
    }
}

/// Allocates the struct field identifier for `property`, making sure neither the
/// field (getter) nor its `set_`/`with_` methods collide with earlier fields or `new`.
pub fn allocate_field(used: &mut HashSet<String>, property: &str) -> String {
    let base = snake_ident(property);
    let mut candidate = base.clone();
    let mut n = 2;
    loop {
        let stem = candidate.trim_end_matches('_').to_string();
        let names = [
            candidate.clone(),
            format!("set_{}", stem),
            format!("with_{}", stem),
        ];
        if candidate != "new" && names.iter().all(|name| !used.contains(name)) {
            used.extend(names);
            return candidate;
        }
        candidate = format!("{}_{}", base.trim_end_matches('_'), n);
        n += 1;
    }
}
