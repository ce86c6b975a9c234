//! Row types returned by a [`SchemaSource`](super::SchemaSource).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::naming::SchemaObjectName;

/// One column pair of a foreign key, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    /// Table declaring the foreign key.
    pub source_table: SchemaObjectName,
    /// Referenced table.
    pub target_table: SchemaObjectName,
    /// Referencing column on the source table.
    pub source_column: String,
    /// Referenced column on the target table.
    pub target_column: String,
    /// Constraint name, when the source reports it.
    #[serde(default)]
    pub constraint_name: Option<String>,
}

/// A column of a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRow {
    /// Column name.
    pub name: String,
    /// Database-specific type name.
    pub data_type: String,
    /// Whether NULL values are allowed.
    #[serde(default)]
    pub is_nullable: bool,
}

impl ColumnRow {
    /// Broad type family of this column.
    pub fn family(&self) -> TypeFamily {
        TypeFamily::parse(&self.data_type)
    }
}

/// The foreign-key columns between one source table and one target table.
///
/// Rows without a constraint name are grouped by table pair; rows carrying
/// a constraint name are grouped per constraint, so two distinct keys
/// between the same pair stay separate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyGroup {
    pub source_table: SchemaObjectName,
    pub target_table: SchemaObjectName,
    pub constraint_name: Option<String>,
    /// Referencing columns, declaration order.
    pub source_columns: Vec<String>,
    /// Referenced columns, positionally matching `source_columns`.
    pub target_columns: Vec<String>,
}

impl ForeignKeyGroup {
    /// Group rows into foreign keys, keeping first-seen order.
    pub fn group(rows: &[ForeignKeyRow]) -> Vec<Self> {
        let mut groups: Vec<Self> = Vec::new();

        for row in rows {
            let existing = groups.iter_mut().find(|g| {
                g.source_table == row.source_table
                    && g.target_table == row.target_table
                    && same_constraint(&g.constraint_name, &row.constraint_name)
            });

            match existing {
                Some(group) => {
                    group.source_columns.push(row.source_column.clone());
                    group.target_columns.push(row.target_column.clone());
                }
                None => groups.push(Self {
                    source_table: row.source_table.clone(),
                    target_table: row.target_table.clone(),
                    constraint_name: row.constraint_name.clone(),
                    source_columns: vec![row.source_column.clone()],
                    target_columns: vec![row.target_column.clone()],
                }),
            }
        }

        groups
    }

    /// Whether the key references its own table.
    pub fn is_self_reference(&self) -> bool {
        self.source_table == self.target_table
    }
}

fn same_constraint(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// A junction table and the two foreign keys that make it one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkingCandidate {
    pub linking_table: SchemaObjectName,
    /// Foreign key to the first referenced table (declaration order).
    pub left: ForeignKeyGroup,
    /// Foreign key to the second referenced table.
    pub right: ForeignKeyGroup,
}

/// Find junction tables for automatic many-to-many discovery.
///
/// A table qualifies when it declares exactly two foreign keys and they
/// reference two distinct tables, neither of which is the table itself.
/// Two keys to the same table (e.g. `manager_id` and `report_id` both to
/// `employees`) do not qualify here; such links are added through the
/// linking-table wizard.
pub fn linking_candidates(groups: &[ForeignKeyGroup]) -> Vec<LinkingCandidate> {
    let mut candidates = Vec::new();

    for table in distinct_sources(groups) {
        let outward: Vec<&ForeignKeyGroup> =
            groups.iter().filter(|g| g.source_table == table).collect();

        let [left, right] = outward.as_slice() else {
            continue;
        };

        if left.is_self_reference() || right.is_self_reference() {
            debug!(table = %table, "skipping linking candidate with a self-referencing key");
            continue;
        }

        if left.target_table == right.target_table {
            info!(
                table = %table,
                target = %left.target_table,
                "both keys reference the same table; use the linking wizard for this junction"
            );
            continue;
        }

        candidates.push(LinkingCandidate {
            linking_table: table,
            left: (*left).clone(),
            right: (*right).clone(),
        });
    }

    candidates
}

/// Tables declaring at least `min` foreign keys, in first-seen order.
pub fn tables_with_outward_keys(groups: &[ForeignKeyGroup], min: usize) -> Vec<SchemaObjectName> {
    distinct_sources(groups)
        .into_iter()
        .filter(|table| groups.iter().filter(|g| &g.source_table == table).count() >= min)
        .collect()
}

fn distinct_sources(groups: &[ForeignKeyGroup]) -> Vec<SchemaObjectName> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter(|g| seen.insert(g.source_table.clone()))
        .map(|g| g.source_table.clone())
        .collect()
}

/// Broad family of a column type, used to match key columns across tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    String,
    Uuid,
    Date,
    Time,
    Timestamp,
    Bool,
    Binary,
    Other,
}

impl TypeFamily {
    /// Classify a database type name such as `int`, `nvarchar(50)` or
    /// `uniqueidentifier`.
    pub fn parse(data_type: &str) -> Self {
        let lowered = data_type.trim().to_lowercase();
        let base = lowered
            .split('(')
            .next()
            .unwrap_or_default()
            .trim();

        match base {
            "tinyint" | "smallint" | "int" | "integer" | "bigint" | "int2" | "int4" | "int8"
            | "int16" | "int32" | "int64" | "serial" | "bigserial" => Self::Integer,
            "decimal" | "numeric" | "number" | "money" | "smallmoney" => Self::Decimal,
            "real" | "float" | "float4" | "float8" | "double" | "double precision" => Self::Float,
            "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "string" | "clob"
            | "character" | "character varying" | "sysname" => Self::String,
            "uuid" | "guid" | "uniqueidentifier" => Self::Uuid,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" | "datetime2" | "smalldatetime" | "timestamp" | "timestamptz"
            | "datetimeoffset" | "timestamp with time zone" => Self::Timestamp,
            "bit" | "bool" | "boolean" => Self::Bool,
            "binary" | "varbinary" | "blob" | "bytea" | "image" => Self::Binary,
            _ => Self::Other,
        }
    }

    /// Whether columns of the two families can be joined.
    ///
    /// Exact family matches are compatible, integers and decimals join with
    /// each other, and an unrecognised type only matches itself.
    pub fn is_compatible_with(self, other: Self) -> bool {
        use TypeFamily::*;

        match (self, other) {
            (Other, _) | (_, Other) => false,
            (a, b) if a == b => true,
            (Integer, Decimal) | (Decimal, Integer) => true,
            _ => false,
        }
    }
}

/// Whether two column lists line up positionally by type.
///
/// Unrecognised types fall back to a case-insensitive comparison of the
/// raw type names.
pub fn columns_align(left: &[ColumnRow], right: &[ColumnRow]) -> bool {
    left.len() == right.len()
        && !left.is_empty()
        && left.iter().zip(right).all(|(l, r)| {
            let (lf, rf) = (l.family(), r.family());
            if lf == TypeFamily::Other || rf == TypeFamily::Other {
                l.data_type.trim().eq_ignore_ascii_case(r.data_type.trim())
            } else {
                lf.is_compatible_with(rf)
            }
        })
}
