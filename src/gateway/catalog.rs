//! Typed view over the gateway configuration's entities.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document::{
    ConfigDocument, DataSourceDocument, EntityDocument, EntitySourceDocument, RelationshipDocument,
};
use super::error::{ConfigError, ConfigResult};
use crate::config::{ConnectionConfig, DatabaseType};
use crate::discovery::ConfigCardinality;
use crate::naming::{display_name, SchemaObjectName, DEFAULT_SCHEMA};

/// Kind of database object behind an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    Table,
    View,
    StoredProcedure,
}

impl SourceType {
    /// Parse the configuration's `source.type`. Absent means table.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("table") => Some(SourceType::Table),
            Some("view") => Some(SourceType::View),
            Some("stored-procedure") | Some("stored_procedure") | Some("storedprocedure") => {
                Some(SourceType::StoredProcedure)
            }
            Some(_) => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Table => write!(f, "table"),
            SourceType::View => write!(f, "view"),
            SourceType::StoredProcedure => write!(f, "stored-procedure"),
        }
    }
}

/// A column exposed under a different field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub column: String,
    pub alias: String,
}

/// A relationship already declared under an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredRelationship {
    /// Key in the entity's `relationships` map.
    pub name: String,
    pub target_entity: String,
    pub cardinality: ConfigCardinality,
    pub source_fields: Vec<String>,
    pub target_fields: Vec<String>,
    /// Explicit `source.displayName`, when the file carries one.
    pub source_display_name: Option<String>,
    /// Explicit `target.displayName`, when the file carries one.
    pub target_display_name: Option<String>,
    pub linking_object: Option<SchemaObjectName>,
    pub linking_source_fields: Vec<String>,
    pub linking_target_fields: Vec<String>,
}

/// An entity entry, keyed by its alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredEntity {
    pub alias: String,
    pub source_object: SchemaObjectName,
    pub source_type: SourceType,
    pub key_fields: Vec<String>,
    pub field_mappings: Vec<FieldMapping>,
    pub relationships: Vec<ConfiguredRelationship>,
}

impl ConfiguredEntity {
    /// Relationship declared under `name`, if any.
    pub fn relationship(&self, name: &str) -> Option<&ConfiguredRelationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// Entities of one configuration document, in declaration order.
///
/// The catalog is read once at the start of an operation; the crate never
/// writes the file back. Changes go through the gateway CLI.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<ConfiguredEntity>,
    data_source: Option<DataSourceDocument>,
    default_schema: String,
}

impl EntityCatalog {
    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            entities = catalog.len(),
            "loaded gateway configuration"
        );
        Ok(catalog)
    }

    /// Parse a configuration document.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let document: ConfigDocument = serde_json::from_str(content)?;
        let raw_entities = document
            .entities
            .ok_or(ConfigError::MissingSection("entities"))?;

        let default_schema = document
            .data_source
            .as_ref()
            .and_then(|ds| DatabaseType::from_str(&ds.database_type).ok())
            .map(|db| db.default_schema())
            .filter(|schema| !schema.is_empty())
            .unwrap_or(DEFAULT_SCHEMA)
            .to_string();

        let entities = raw_entities
            .into_iter()
            .map(|(alias, value)| parse_entity(&alias, value, &default_schema))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            entities,
            data_source: document.data_source,
            default_schema,
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfiguredEntity> {
        self.entities.iter()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.alias.as_str()).collect()
    }

    pub fn get(&self, alias: &str) -> Option<&ConfiguredEntity> {
        self.entities.iter().find(|e| e.alias == alias)
    }

    /// Schema assumed for unqualified names in this configuration.
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Alias of the entity backed by `object`.
    ///
    /// If two entities declare the same object, the first declared wins.
    pub fn resolve_alias(&self, object: &SchemaObjectName) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| &e.source_object == object)
            .map(|e| e.alias.as_str())
    }

    /// Display names of a declared relationship, as `(source, target)`.
    ///
    /// Explicit display names win. Otherwise they are derived from the
    /// entities' source objects and the relationship's field lists; the
    /// target side is `None` when the target entity is not in the catalog.
    pub fn relationship_display_names(
        &self,
        owner: &ConfiguredEntity,
        relationship: &ConfiguredRelationship,
    ) -> (String, Option<String>) {
        let source = relationship
            .source_display_name
            .clone()
            .unwrap_or_else(|| display_name(&owner.source_object, &relationship.source_fields));

        let target = relationship.target_display_name.clone().or_else(|| {
            self.get(&relationship.target_entity)
                .map(|t| display_name(&t.source_object, &relationship.target_fields))
        });

        (source, target)
    }

    /// Whether `alias` already declares a relationship to `target_alias`
    /// with exactly these display names.
    pub fn has_relationship(
        &self,
        alias: &str,
        target_alias: &str,
        source_display_name: &str,
        target_display_name: &str,
    ) -> bool {
        let Some(owner) = self.get(alias) else {
            return false;
        };

        owner
            .relationships
            .iter()
            .filter(|r| r.target_entity == target_alias)
            .any(|r| {
                let (source, target) = self.relationship_display_names(owner, r);
                source == source_display_name && target.as_deref() == Some(target_display_name)
            })
    }

    /// Relationship names already used under `alias`.
    pub fn relationship_names(&self, alias: &str) -> Vec<&str> {
        self.get(alias)
            .map(|e| e.relationships.iter().map(|r| r.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Record a relationship in memory, as if the gateway CLI had written
    /// it and the file had been read again. Returns false for an unknown
    /// alias.
    pub fn insert_relationship(&mut self, alias: &str, relationship: ConfiguredRelationship) -> bool {
        match self.entities.iter_mut().find(|e| e.alias == alias) {
            Some(entity) => {
                entity.relationships.push(relationship);
                true
            }
            None => false,
        }
    }

    /// The `data-source` section, if present.
    pub fn data_source(&self) -> Option<&DataSourceDocument> {
        self.data_source.as_ref()
    }

    /// Resolve the data source to a connection.
    ///
    /// `env_file` holds variables from the `.env` file beside the
    /// configuration; the process environment wins over it.
    pub fn connection(&self, env_file: &HashMap<String, String>) -> ConfigResult<ConnectionConfig> {
        let data_source = self
            .data_source
            .as_ref()
            .ok_or(ConfigError::MissingSection("data-source"))?;

        Ok(ConnectionConfig::resolve(
            &data_source.database_type,
            data_source.connection_string.as_deref(),
            env_file,
        )?)
    }
}

fn parse_entity(
    alias: &str,
    value: serde_json::Value,
    default_schema: &str,
) -> ConfigResult<ConfiguredEntity> {
    let document: EntityDocument = serde_json::from_value(value)
        .map_err(|e| ConfigError::invalid_entity(alias, e.to_string()))?;

    let (object, schema, source_type, key_fields) = match document.source {
        Some(EntitySourceDocument::Object(object)) => (Some(object), None, None, Vec::new()),
        Some(EntitySourceDocument::Detailed(detail)) => (
            detail.object,
            detail.schema,
            detail.source_type,
            detail.key_fields,
        ),
        None => (None, None, None, Vec::new()),
    };

    let object = object
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| ConfigError::invalid_entity(alias, "missing source object"))?;

    let source_object = match schema.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(schema) => SchemaObjectName::normalize_in(&object, schema),
        None => SchemaObjectName::normalize_in(&object, default_schema),
    };

    let source_type = SourceType::parse(source_type.as_deref()).ok_or_else(|| {
        ConfigError::invalid_entity(alias, "source type must be table, view or stored-procedure")
    })?;

    let field_mappings = document
        .mappings
        .into_iter()
        .filter_map(|(column, value)| {
            value.as_str().map(|alias| FieldMapping {
                column,
                alias: alias.to_string(),
            })
        })
        .collect();

    let relationships = document
        .relationships
        .into_iter()
        .map(|(name, value)| parse_relationship(alias, name, value, default_schema))
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(ConfiguredEntity {
        alias: alias.to_string(),
        source_object,
        source_type,
        key_fields,
        field_mappings,
        relationships,
    })
}

fn parse_relationship(
    alias: &str,
    name: String,
    value: serde_json::Value,
    default_schema: &str,
) -> ConfigResult<ConfiguredRelationship> {
    let document: RelationshipDocument = serde_json::from_value(value).map_err(|e| {
        ConfigError::invalid_entity(alias, format!("relationship `{name}`: {e}"))
    })?;

    let target_entity = document
        .target_entity()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ConfigError::invalid_entity(alias, format!("relationship `{name}` has no target.entity"))
        })?
        .to_string();

    // The gateway defaults a missing cardinality to "many".
    let cardinality = match document.cardinality.as_deref() {
        None => ConfigCardinality::Many,
        Some(value) => ConfigCardinality::parse(value).ok_or_else(|| {
            ConfigError::invalid_entity(
                alias,
                format!("relationship `{name}` has cardinality `{value}`"),
            )
        })?,
    };

    Ok(ConfiguredRelationship {
        target_entity,
        cardinality,
        source_fields: document.source_fields(),
        target_fields: document.target_fields(),
        source_display_name: document.source_display_name().map(str::to_string),
        target_display_name: document.target_display_name().map(str::to_string),
        linking_object: document
            .linking_object()
            .map(|o| SchemaObjectName::normalize_in(o, default_schema)),
        linking_source_fields: document.linking_source_fields(),
        linking_target_fields: document.linking_target_fields(),
        name,
    })
}
