//! Uniform relationship record produced by discovery and the linking wizard.

use serde::Serialize;

use super::cardinality::Cardinality;
use crate::metadata::{ForeignKeyGroup, LinkingCandidate};
use crate::naming::{display_name, SchemaObjectName};

/// A relationship inferred from the schema.
///
/// `source_columns` and `target_columns` pair up positionally. For a
/// relationship through a linking table they are the key columns on the two
/// endpoints, and the `linking_*` columns are the linking table's foreign
/// key columns pointing at each endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredRelationship {
    pub source_object: SchemaObjectName,
    pub source_display_name: String,
    pub source_columns: Vec<String>,
    pub target_object: SchemaObjectName,
    pub target_display_name: String,
    pub target_columns: Vec<String>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linking_object: Option<SchemaObjectName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linking_source_columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linking_target_columns: Vec<String>,
}

impl DiscoveredRelationship {
    /// A relationship carried by a foreign key.
    pub fn direct(
        source_object: SchemaObjectName,
        source_columns: Vec<String>,
        target_object: SchemaObjectName,
        target_columns: Vec<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source_display_name: display_name(&source_object, &source_columns),
            target_display_name: display_name(&target_object, &target_columns),
            source_object,
            source_columns,
            target_object,
            target_columns,
            cardinality,
            linking_object: None,
            linking_source_columns: Vec::new(),
            linking_target_columns: Vec::new(),
        }
    }

    /// A many-to-many relationship through a linking table.
    pub fn through_linking_table(
        linking_object: SchemaObjectName,
        source: (SchemaObjectName, Vec<String>),
        linking_source_columns: Vec<String>,
        target: (SchemaObjectName, Vec<String>),
        linking_target_columns: Vec<String>,
    ) -> Self {
        let (source_object, source_columns) = source;
        let (target_object, target_columns) = target;
        Self {
            source_display_name: display_name(&source_object, &source_columns),
            target_display_name: display_name(&target_object, &target_columns),
            source_object,
            source_columns,
            target_object,
            target_columns,
            cardinality: Cardinality::ManyToMany,
            linking_object: Some(linking_object),
            linking_source_columns,
            linking_target_columns,
        }
    }

    /// Build the record for one foreign key group.
    pub(crate) fn from_group(group: &ForeignKeyGroup, cardinality: Cardinality) -> Self {
        Self::direct(
            group.source_table.clone(),
            group.source_columns.clone(),
            group.target_table.clone(),
            group.target_columns.clone(),
            cardinality,
        )
    }

    /// Both directions through a junction table, left to right first.
    pub(crate) fn from_candidate(candidate: &LinkingCandidate) -> [Self; 2] {
        let left = &candidate.left;
        let right = &candidate.right;

        [
            Self::through_linking_table(
                candidate.linking_table.clone(),
                (left.target_table.clone(), left.target_columns.clone()),
                left.source_columns.clone(),
                (right.target_table.clone(), right.target_columns.clone()),
                right.source_columns.clone(),
            ),
            Self::through_linking_table(
                candidate.linking_table.clone(),
                (right.target_table.clone(), right.target_columns.clone()),
                right.source_columns.clone(),
                (left.target_table.clone(), left.target_columns.clone()),
                left.source_columns.clone(),
            ),
        ]
    }

    pub fn is_linking(&self) -> bool {
        self.linking_object.is_some()
    }

    pub fn is_self_reference(&self) -> bool {
        self.source_object == self.target_object
    }
}
