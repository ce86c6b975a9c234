//! The relationship update command.

use std::path::Path;

use serde::Serialize;

use super::error::{EmitError, EmitResult};
use super::name::relationship_name;
use crate::discovery::{ConfigCardinality, DiscoveredRelationship};
use crate::gateway::ConfiguredRelationship;
use crate::naming::SchemaObjectName;
use crate::reconcile::ReconciledRelationship;

/// One relationship update, applied by the gateway CLI as
/// `update <source> --relationship <name> ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRelationship {
    pub source_alias: String,
    pub target_alias: String,
    pub relationship_name: String,
    pub cardinality: ConfigCardinality,
    /// `src:tgt` pairs, comma separated.
    pub relationship_fields: String,
    pub linking_object: Option<SchemaObjectName>,
    pub linking_source_fields: Option<String>,
    pub linking_target_fields: Option<String>,
}

impl UpdateRelationship {
    /// Build the update for a discovered relationship.
    ///
    /// `existing_names` are the relationship names already declared under
    /// the source entity; the new name avoids them.
    pub fn new(
        source_alias: &str,
        target_alias: &str,
        relationship: &DiscoveredRelationship,
        existing_names: &[&str],
    ) -> EmitResult<Self> {
        let cardinality = relationship.cardinality.to_config();
        let relationship_fields =
            encode_relationship_fields(&relationship.source_columns, &relationship.target_columns)?;

        let (linking_source_fields, linking_target_fields) = match relationship.linking_object {
            Some(_) => (
                Some(relationship.linking_source_columns.join(",")),
                Some(relationship.linking_target_columns.join(",")),
            ),
            None => (None, None),
        };

        Ok(Self {
            source_alias: source_alias.to_string(),
            target_alias: target_alias.to_string(),
            relationship_name: relationship_name(target_alias, cardinality, existing_names),
            cardinality,
            relationship_fields,
            linking_object: relationship.linking_object.clone(),
            linking_source_fields,
            linking_target_fields,
        })
    }

    /// Build the update for a reconciled relationship.
    pub fn from_reconciled(
        reconciled: &ReconciledRelationship,
        existing_names: &[&str],
    ) -> EmitResult<Self> {
        Self::new(
            &reconciled.source_alias,
            &reconciled.target_alias,
            &reconciled.relationship,
            existing_names,
        )
    }

    /// Gateway CLI arguments, program name excluded.
    pub fn to_args(&self, config_file: &Path) -> Vec<String> {
        let mut args = vec![
            "update".to_string(),
            self.source_alias.clone(),
            "--relationship".to_string(),
            self.relationship_name.clone(),
            "--cardinality".to_string(),
            self.cardinality.to_string(),
            "--target.entity".to_string(),
            self.target_alias.clone(),
            "--relationship.fields".to_string(),
            self.relationship_fields.clone(),
        ];

        if let Some(linking) = &self.linking_object {
            args.push("--linking.object".to_string());
            args.push(linking.display());
            if let Some(fields) = &self.linking_source_fields {
                args.push("--linking.source.fields".to_string());
                args.push(fields.clone());
            }
            if let Some(fields) = &self.linking_target_fields {
                args.push("--linking.target.fields".to_string());
                args.push(fields.clone());
            }
        }

        args.push("--config".to_string());
        args.push(config_file.display().to_string());
        args
    }

    /// The relationship as the gateway records it once this update is
    /// applied.
    pub fn to_configured(&self) -> ConfiguredRelationship {
        let (source_fields, target_fields) = decode_relationship_fields(&self.relationship_fields);
        ConfiguredRelationship {
            name: self.relationship_name.clone(),
            target_entity: self.target_alias.clone(),
            cardinality: self.cardinality,
            source_fields,
            target_fields,
            source_display_name: None,
            target_display_name: None,
            linking_object: self.linking_object.clone(),
            linking_source_fields: split_fields(self.linking_source_fields.as_deref()),
            linking_target_fields: split_fields(self.linking_target_fields.as_deref()),
        }
    }
}

/// Zip source and target columns into `src:tgt,src:tgt`.
///
/// Column names are not escaped; a name containing `,` or `:` cannot be
/// expressed.
pub fn encode_relationship_fields(source: &[String], target: &[String]) -> EmitResult<String> {
    if source.len() != target.len() {
        return Err(EmitError::FieldCountMismatch {
            source_count: source.len(),
            target_count: target.len(),
        });
    }
    if source.is_empty() {
        return Err(EmitError::NoFields);
    }

    Ok(source
        .iter()
        .zip(target)
        .map(|(s, t)| format!("{s}:{t}"))
        .collect::<Vec<_>>()
        .join(","))
}

fn decode_relationship_fields(encoded: &str) -> (Vec<String>, Vec<String>) {
    encoded
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .unzip()
}

fn split_fields(fields: Option<&str>) -> Vec<String> {
    fields
        .map(|f| f.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}
