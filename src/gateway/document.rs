//! Serde shapes of the gateway's JSON configuration.
//!
//! Only the sections this crate reads are modelled; everything else in the
//! document is ignored. The gateway writes relationship properties as flat
//! dotted keys (`"target.entity"`), and hand-written files sometimes nest
//! them (`"target": {"entity": ...}`); both are accepted.

use serde::Deserialize;

/// Top level of the configuration document.
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigDocument {
    #[serde(rename = "data-source", default)]
    pub data_source: Option<DataSourceDocument>,

    /// Kept as raw JSON so each entity can be validated with its alias in
    /// the error; `preserve_order` keeps declaration order.
    #[serde(default)]
    pub entities: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The `data-source` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceDocument {
    #[serde(rename = "database-type")]
    pub database_type: String,

    #[serde(rename = "connection-string", default)]
    pub connection_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntityDocument {
    #[serde(default)]
    pub source: Option<EntitySourceDocument>,

    /// Column name to exposed field name.
    #[serde(default)]
    pub mappings: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub relationships: serde_json::Map<String, serde_json::Value>,
}

/// `source` is either the bare object name or a detailed object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EntitySourceDocument {
    Object(String),
    Detailed(SourceDetailDocument),
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceDetailDocument {
    #[serde(default)]
    pub object: Option<String>,

    #[serde(rename = "type", default)]
    pub source_type: Option<String>,

    /// Schema for an unqualified `object`.
    #[serde(default)]
    pub schema: Option<String>,

    #[serde(rename = "key-fields", default)]
    pub key_fields: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RelationshipDocument {
    #[serde(default)]
    pub cardinality: Option<String>,

    #[serde(rename = "target.entity", default)]
    pub target_entity: Option<String>,

    #[serde(rename = "source.fields", default)]
    pub source_fields: Option<Vec<String>>,

    #[serde(rename = "target.fields", default)]
    pub target_fields: Option<Vec<String>>,

    #[serde(rename = "source.displayName", default)]
    pub source_display_name: Option<String>,

    #[serde(rename = "target.displayName", default)]
    pub target_display_name: Option<String>,

    #[serde(rename = "linking.object", default)]
    pub linking_object: Option<String>,

    #[serde(rename = "linking.source.fields", default)]
    pub linking_source_fields: Option<Vec<String>>,

    #[serde(rename = "linking.target.fields", default)]
    pub linking_target_fields: Option<Vec<String>>,

    #[serde(default)]
    pub source: Option<EndpointDocument>,

    #[serde(default)]
    pub target: Option<EndpointDocument>,

    #[serde(default)]
    pub linking: Option<LinkingDocument>,
}

/// Nested `source` / `target` form.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EndpointDocument {
    #[serde(default)]
    pub entity: Option<String>,

    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Nested `linking` form.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkingDocument {
    #[serde(default)]
    pub object: Option<String>,

    #[serde(default)]
    pub source: Option<EndpointDocument>,

    #[serde(default)]
    pub target: Option<EndpointDocument>,
}

impl RelationshipDocument {
    pub fn target_entity(&self) -> Option<&str> {
        self.target_entity
            .as_deref()
            .or_else(|| self.target.as_ref()?.entity.as_deref())
    }

    pub fn source_display_name(&self) -> Option<&str> {
        self.source_display_name
            .as_deref()
            .or_else(|| self.source.as_ref()?.display_name.as_deref())
    }

    pub fn target_display_name(&self) -> Option<&str> {
        self.target_display_name
            .as_deref()
            .or_else(|| self.target.as_ref()?.display_name.as_deref())
    }

    pub fn source_fields(&self) -> Vec<String> {
        self.source_fields
            .clone()
            .or_else(|| self.source.as_ref()?.fields.clone())
            .unwrap_or_default()
    }

    pub fn target_fields(&self) -> Vec<String> {
        self.target_fields
            .clone()
            .or_else(|| self.target.as_ref()?.fields.clone())
            .unwrap_or_default()
    }

    pub fn linking_object(&self) -> Option<&str> {
        self.linking_object
            .as_deref()
            .or_else(|| self.linking.as_ref()?.object.as_deref())
    }

    pub fn linking_source_fields(&self) -> Vec<String> {
        self.linking_source_fields
            .clone()
            .or_else(|| self.linking.as_ref()?.source.as_ref()?.fields.clone())
            .unwrap_or_default()
    }

    pub fn linking_target_fields(&self) -> Vec<String> {
        self.linking_target_fields
            .clone()
            .or_else(|| self.linking.as_ref()?.target.as_ref()?.fields.clone())
            .unwrap_or_default()
    }
}
