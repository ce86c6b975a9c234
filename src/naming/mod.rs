//! Database object name normalization.
//!
//! Object names arrive from several places in different shapes: the gateway
//! configuration (`"dbo.Authors"`, `"[dbo].[Authors]"`, `"Authors"`), the
//! schema worker (separate schema and table fields) and user input. Every
//! comparison in the crate goes through [`SchemaObjectName`] so that all of
//! these spell the same object.
//!
//! ```
//! use dabrel::naming::SchemaObjectName;
//!
//! let a = SchemaObjectName::normalize("[dbo].[Actor]");
//! let b = SchemaObjectName::normalize("actor");
//! assert_eq!(a, b);
//! assert_eq!(a.display(), "dbo.Actor");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Schema assumed when an identifier is not schema-qualified.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// A schema-qualified database object identifier.
///
/// Equality and hashing are case-insensitive; the original casing is kept
/// for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaObjectName {
    /// Schema part, original casing.
    pub schema: String,
    /// Object part, original casing.
    pub name: String,
}

impl SchemaObjectName {
    /// Build a name from already separated parts.
    ///
    /// Parts are cleaned the same way [`normalize`](Self::normalize) cleans
    /// them, so `new("[dbo]", "Actor")` equals `normalize("dbo.actor")`.
    pub fn new(schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        let schema = clean_part(schema.as_ref());
        let name = clean_part(name.as_ref());
        Self {
            schema: if schema.is_empty() {
                DEFAULT_SCHEMA.to_string()
            } else {
                schema
            },
            name,
        }
    }

    /// Normalize a raw identifier.
    ///
    /// Strips `[`/`]`, splits on the first `.`, and defaults the schema to
    /// `dbo`. Never fails: an empty part is kept empty (or defaulted, for the
    /// schema) rather than rejected.
    pub fn normalize(raw: &str) -> Self {
        let cleaned = raw.trim();
        match split_qualified(cleaned) {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new(DEFAULT_SCHEMA, cleaned),
        }
    }

    /// Normalize with an explicit fallback schema for unqualified names.
    pub fn normalize_in(raw: &str, default_schema: &str) -> Self {
        let cleaned = raw.trim();
        match split_qualified(cleaned) {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new(default_schema, cleaned),
        }
    }

    /// Case-insensitive comparison of two raw identifiers.
    pub fn equals(a: &str, b: &str) -> bool {
        Self::normalize(a) == Self::normalize(b)
    }

    /// Lower-cased `schema.name`, the comparison key.
    pub fn canonical(&self) -> String {
        format!("{}.{}", fold(&self.schema), fold(&self.name))
    }

    /// `schema.name` in original casing.
    ///
    /// A part containing `.` is bracketed, so normalizing the result gives
    /// back the same name.
    pub fn display(&self) -> String {
        format!("{}.{}", quote_part(&self.schema), quote_part(&self.name))
    }

    /// Whether the object lives in the given schema.
    pub fn in_schema(&self, schema: &str) -> bool {
        fold(&self.schema) == fold(&clean_part(schema))
    }
}

impl PartialEq for SchemaObjectName {
    fn eq(&self, other: &Self) -> bool {
        fold(&self.schema) == fold(&other.schema) && fold(&self.name) == fold(&other.name)
    }
}

impl Eq for SchemaObjectName {}

impl Hash for SchemaObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for SchemaObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for SchemaObjectName {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

/// Relationship endpoint display name, `schema.table[col1,col2]`.
///
/// The object part is canonical (lower-cased) so names built from the
/// schema and from the gateway configuration agree; column names and their
/// order are kept as given. Two relationships are the same iff these
/// strings match exactly.
pub fn display_name(object: &SchemaObjectName, columns: &[String]) -> String {
    format!("{}[{}]", object.canonical(), columns.join(","))
}

/// Split on the first `.` that is not inside brackets.
fn split_qualified(raw: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in raw.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => return Some((&raw[..idx], &raw[idx + 1..])),
            _ => {}
        }
    }
    None
}

/// The one case folding used for every name comparison.
fn fold(part: &str) -> String {
    part.to_lowercase()
}

fn quote_part(part: &str) -> Cow<'_, str> {
    if part.contains('.') {
        Cow::Owned(format!("[{part}]"))
    } else {
        Cow::Borrowed(part)
    }
}

fn clean_part(part: &str) -> String {
    part.trim()
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .collect::<String>()
        .trim()
        .to_string()
}
