//! Reconciliation of discovered relationships with the configuration.
//!
//! A discovered relationship is offered only when both of its tables are
//! configured entities and the source entity does not already declare it.
//! Sameness is decided on the target alias and the exact display names, so
//! two relationships between the same tables over different columns (or the
//! same columns in a different order) are both kept.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::discovery::DiscoveredRelationship;
use crate::gateway::EntityCatalog;

/// A discovered relationship with both endpoints resolved to aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRelationship {
    pub source_alias: String,
    pub target_alias: String,
    pub already_configured: bool,
    #[serde(flatten)]
    pub relationship: DiscoveredRelationship,
}

impl ReconciledRelationship {
    /// One-line description for selection lists.
    pub fn label(&self) -> String {
        let r = &self.relationship;
        match &r.linking_object {
            Some(linking) => format!(
                "{} -> {} ({} via {}) [{} -> {}]",
                self.source_alias,
                self.target_alias,
                r.cardinality,
                linking,
                r.source_columns.join(","),
                r.target_columns.join(",")
            ),
            None => format!(
                "{} -> {} ({}) [{} -> {}]",
                self.source_alias,
                self.target_alias,
                r.cardinality,
                r.source_columns.join(","),
                r.target_columns.join(",")
            ),
        }
    }
}

impl fmt::Display for ReconciledRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub discovered: usize,
    /// Dropped because an endpoint is not a configured entity.
    pub unresolved: usize,
    /// Dropped because the relationship is already declared.
    pub already_configured: usize,
    pub eligible: usize,
}

/// Relationships that can be added to the configuration, in discovery order.
pub fn reconcile(
    catalog: &EntityCatalog,
    discovered: &[DiscoveredRelationship],
) -> Vec<ReconciledRelationship> {
    reconcile_with_report(catalog, discovered).0
}

/// [`reconcile`] plus counts of what was dropped and why.
pub fn reconcile_with_report(
    catalog: &EntityCatalog,
    discovered: &[DiscoveredRelationship],
) -> (Vec<ReconciledRelationship>, ReconcileReport) {
    let mut report = ReconcileReport {
        discovered: discovered.len(),
        ..ReconcileReport::default()
    };
    let mut eligible = Vec::new();

    for relationship in discovered {
        let (Some(source_alias), Some(target_alias)) = (
            catalog.resolve_alias(&relationship.source_object),
            catalog.resolve_alias(&relationship.target_object),
        ) else {
            debug!(
                source = %relationship.source_object,
                target = %relationship.target_object,
                "endpoint not configured"
            );
            report.unresolved += 1;
            continue;
        };

        let already_configured = catalog.has_relationship(
            source_alias,
            target_alias,
            &relationship.source_display_name,
            &relationship.target_display_name,
        );
        if already_configured {
            debug!(
                source = source_alias,
                target = target_alias,
                display_name = %relationship.source_display_name,
                "already configured"
            );
            report.already_configured += 1;
            continue;
        }

        eligible.push(ReconciledRelationship {
            source_alias: source_alias.to_string(),
            target_alias: target_alias.to_string(),
            already_configured,
            relationship: relationship.clone(),
        });
    }

    report.eligible = eligible.len();
    (eligible, report)
}

/// Only relationships whose source is `alias`.
pub fn for_source_alias(
    relationships: Vec<ReconciledRelationship>,
    alias: &str,
) -> Vec<ReconciledRelationship> {
    relationships
        .into_iter()
        .filter(|r| r.source_alias == alias)
        .collect()
}

/// Sorted by source alias, then target alias; ties keep discovery order.
pub fn sorted_for_display(mut relationships: Vec<ReconciledRelationship>) -> Vec<ReconciledRelationship> {
    relationships.sort_by(|a, b| {
        a.source_alias
            .to_lowercase()
            .cmp(&b.source_alias.to_lowercase())
            .then_with(|| a.target_alias.to_lowercase().cmp(&b.target_alias.to_lowercase()))
    });
    relationships
}
