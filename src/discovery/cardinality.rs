//! Cardinality inference.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a relationship between two tables, seen from the source side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Infer cardinality by comparing foreign-key columns with primary keys.
    ///
    /// Column sets are compared as sets (case-insensitively); their order
    /// does not matter here. An empty primary key never matches.
    pub fn infer(
        source_key_columns: &[String],
        target_key_columns: &[String],
        fk_source_columns: &[String],
        fk_target_columns: &[String],
    ) -> Self {
        let source_matches = same_column_set(fk_source_columns, source_key_columns);
        let target_matches = same_column_set(fk_target_columns, target_key_columns);

        match (source_matches, target_matches) {
            (true, true) => Cardinality::OneToOne,
            (true, false) => Cardinality::OneToMany,
            (false, true) => Cardinality::ManyToOne,
            (false, false) => Cardinality::ManyToMany,
        }
    }

    /// The same relationship seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            other => other,
        }
    }

    /// Cardinality as the gateway records it: how many targets per source row.
    pub fn to_config(self) -> ConfigCardinality {
        match self {
            Cardinality::OneToOne | Cardinality::ManyToOne => ConfigCardinality::One,
            Cardinality::OneToMany | Cardinality::ManyToMany => ConfigCardinality::Many,
        }
    }

    /// Value passed to the gateway CLI's `--cardinality`.
    pub fn command_value(self) -> &'static str {
        self.to_config().as_str()
    }

    /// Whether this shape needs explicit confirmation before it is added.
    ///
    /// A direct foreign key matching neither primary key is ambiguous.
    pub fn is_ambiguous(self) -> bool {
        self == Cardinality::ManyToMany
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "one-to-one"),
            Cardinality::OneToMany => write!(f, "one-to-many"),
            Cardinality::ManyToOne => write!(f, "many-to-one"),
            Cardinality::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// Relationship cardinality as stored in the gateway configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigCardinality {
    One,
    Many,
}

impl ConfigCardinality {
    /// Parse the configuration's `cardinality` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "one" => Some(ConfigCardinality::One),
            "many" => Some(ConfigCardinality::Many),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigCardinality::One => "one",
            ConfigCardinality::Many => "many",
        }
    }
}

impl fmt::Display for ConfigCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let lower = |cols: &[String]| -> HashSet<String> {
        cols.iter().map(|c| c.to_lowercase()).collect()
    };
    lower(a) == lower(b)
}
