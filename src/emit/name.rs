//! Relationship naming.
//!
//! New relationships are named after their target entity: camel-cased, and
//! pluralized when the relationship points at many rows. A name already
//! used under the source entity gets a numeric suffix.

use inflector::Inflector;

use crate::discovery::ConfigCardinality;

/// Irregular plurals the inflector gets wrong for entity names.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("analysis", "analyses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Name for a new relationship from `source` to `target_alias`.
pub fn relationship_name(
    target_alias: &str,
    cardinality: ConfigCardinality,
    existing: &[&str],
) -> String {
    let base = target_alias.to_camel_case();
    let base = match cardinality {
        ConfigCardinality::One => base,
        ConfigCardinality::Many => pluralize(&base),
    };

    if !is_taken(&base, existing) {
        return base;
    }

    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !is_taken(candidate, existing))
        .unwrap_or(base)
}

fn is_taken(name: &str, existing: &[&str]) -> bool {
    existing.iter().any(|e| e.eq_ignore_ascii_case(name))
}

/// Pluralize the last word of a camel-cased name.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let split = word
        .char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    let (head, last) = word.split_at(split);
    let lower = last.to_lowercase();

    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return format!("{head}{}", match_case(last, plural));
        }
    }

    format!("{head}{}", last.to_plural())
}

fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = replacement.chars();
    match (original.chars().next(), chars.next()) {
        (Some(o), Some(first)) if o.is_uppercase() => {
            first.to_uppercase().chain(chars).collect()
        }
        _ => replacement.to_string(),
    }
}
