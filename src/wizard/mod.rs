//! Guided many-to-many setup through a linking table.
//!
//! Automatic discovery only offers junction tables with exactly two
//! foreign keys to two different tables. The wizard covers the rest: the
//! user picks the linking table, its key columns for each side, the
//! configured entities on each side and their matching key columns.
//!
//! ```text
//! SelectLinkingTable ─▶ SelectLeftKeys ─▶ SelectRightKeys ─▶ SelectLeftEntity
//!                                                                   │
//!   Done ◀── Emit ◀── SelectRightEntityKeys ◀── SelectLeftEntityKeys ◀── SelectRightEntity
//! ```
//!
//! Every prompt answered with nothing cancels the wizard. A selection of the
//! wrong size (right keys against left keys, entity keys against linking
//! keys) is reported and asked again.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::discovery::DiscoveredRelationship;
use crate::emit::{EmitError, RelationshipEmitter, UpdateRelationship};
use crate::gateway::{ConfiguredEntity, EntityCatalog};
use crate::metadata::{columns_align, ColumnRow, SchemaError, SchemaSource};
use crate::naming::SchemaObjectName;
use crate::prompt::Prompter;

/// Errors that end the wizard.
#[derive(Debug, Error)]
pub enum WizardError {
    /// A schema query failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The gateway CLI rejected the update.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    SelectLinkingTable,
    SelectLeftKeys,
    SelectRightKeys,
    SelectLeftEntity,
    SelectRightEntity,
    SelectLeftEntityKeys,
    SelectRightEntityKeys,
    Emit,
    Done,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardState::SelectLinkingTable => "select linking table",
            WizardState::SelectLeftKeys => "select left keys",
            WizardState::SelectRightKeys => "select right keys",
            WizardState::SelectLeftEntity => "select left entity",
            WizardState::SelectRightEntity => "select right entity",
            WizardState::SelectLeftEntityKeys => "select left entity keys",
            WizardState::SelectRightEntityKeys => "select right entity keys",
            WizardState::Emit => "emit",
            WizardState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a wizard run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// The relationship was applied.
    Applied(UpdateRelationship),
    /// The user backed out at this step.
    Cancelled(WizardState),
    /// There was nothing to choose from.
    NothingToDo(String),
}

/// A configured entity whose key lines up with one side of the linking keys.
#[derive(Debug, Clone)]
struct EntityCandidate<'a> {
    entity: &'a ConfiguredEntity,
    key_columns: Vec<ColumnRow>,
}

impl EntityCandidate<'_> {
    fn label(&self) -> String {
        format!("{} ({})", self.entity.alias, self.entity.source_object)
    }
}

enum Step {
    Next(WizardState),
    Finish(WizardOutcome),
}

/// One run of the linking-table wizard. Consumed by [`run`](Self::run).
pub struct LinkingTableWizard<'a> {
    source: &'a dyn SchemaSource,
    catalog: &'a EntityCatalog,
    prompter: &'a dyn Prompter,
    emitter: &'a RelationshipEmitter,

    linking_table: Option<SchemaObjectName>,
    linking_columns: Vec<ColumnRow>,
    left_keys: Vec<ColumnRow>,
    right_keys: Vec<ColumnRow>,
    candidates: Vec<EntityCandidate<'a>>,
    left_entity: Option<usize>,
    right_entity: Option<usize>,
    left_entity_keys: Vec<String>,
    right_entity_keys: Vec<String>,
    applied: Option<UpdateRelationship>,
}

impl<'a> LinkingTableWizard<'a> {
    pub fn new(
        source: &'a dyn SchemaSource,
        catalog: &'a EntityCatalog,
        prompter: &'a dyn Prompter,
        emitter: &'a RelationshipEmitter,
    ) -> Self {
        Self {
            source,
            catalog,
            prompter,
            emitter,
            linking_table: None,
            linking_columns: Vec::new(),
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            candidates: Vec::new(),
            left_entity: None,
            right_entity: None,
            left_entity_keys: Vec::new(),
            right_entity_keys: Vec::new(),
            applied: None,
        }
    }

    /// Walk the steps until the relationship is applied or the user stops.
    pub async fn run(mut self) -> Result<WizardOutcome, WizardError> {
        let mut state = WizardState::SelectLinkingTable;

        loop {
            debug!(%state, "linking wizard");
            let step = match state {
                WizardState::SelectLinkingTable => self.select_linking_table().await?,
                WizardState::SelectLeftKeys => self.select_linking_keys(Side::Left).await?,
                WizardState::SelectRightKeys => self.select_linking_keys(Side::Right).await?,
                WizardState::SelectLeftEntity => self.select_entity(Side::Left).await,
                WizardState::SelectRightEntity => self.select_entity(Side::Right).await,
                WizardState::SelectLeftEntityKeys => self.select_entity_keys(Side::Left).await,
                WizardState::SelectRightEntityKeys => self.select_entity_keys(Side::Right).await,
                WizardState::Emit => self.emit().await?,
                WizardState::Done => Step::Finish(match self.applied.take() {
                    Some(update) => WizardOutcome::Applied(update),
                    None => WizardOutcome::Cancelled(WizardState::Emit),
                }),
            };

            match step {
                Step::Next(next) => state = next,
                Step::Finish(outcome) => return Ok(outcome),
            }
        }
    }

    async fn select_linking_table(&mut self) -> Result<Step, WizardError> {
        let tables = self.source.query_wizard_linking_tables().await?;
        if tables.is_empty() {
            return Ok(Step::Finish(WizardOutcome::NothingToDo(
                "no potential linking tables".into(),
            )));
        }

        let labels: Vec<String> = tables.iter().map(|t| t.display()).collect();
        let Some(choice) = self.prompter.select_one("Select the linking table", &labels).await
        else {
            return Ok(cancelled(WizardState::SelectLinkingTable));
        };

        let Some(table) = tables.get(choice).cloned() else {
            return Ok(cancelled(WizardState::SelectLinkingTable));
        };
        self.linking_columns = self.source.query_columns(&table).await?;
        if self.linking_columns.is_empty() {
            return Ok(Step::Finish(WizardOutcome::NothingToDo(format!(
                "no columns found for {table}"
            ))));
        }
        self.linking_table = Some(table);
        Ok(Step::Next(WizardState::SelectLeftKeys))
    }

    async fn select_linking_keys(&mut self, side: Side) -> Result<Step, WizardError> {
        let labels: Vec<String> = self.linking_columns.iter().map(|c| c.name.clone()).collect();
        let title = format!("Select the {side} key columns of the linking table");
        let chosen = self.prompter.select_many(&title, &labels).await;
        if chosen.is_empty() {
            return Ok(cancelled(side.pick(
                WizardState::SelectLeftKeys,
                WizardState::SelectRightKeys,
            )));
        }

        let keys: Vec<ColumnRow> = chosen
            .into_iter()
            .filter_map(|idx| self.linking_columns.get(idx).cloned())
            .collect();

        match side {
            Side::Left => {
                self.left_keys = keys;
                Ok(Step::Next(WizardState::SelectRightKeys))
            }
            Side::Right if keys.len() != self.left_keys.len() => {
                warn!(
                    left = self.left_keys.len(),
                    right = keys.len(),
                    "linking key counts differ"
                );
                self.prompter
                    .notify(&format!(
                        "Select exactly {} column(s), as many as on the left side.",
                        self.left_keys.len()
                    ))
                    .await;
                Ok(Step::Next(WizardState::SelectRightKeys))
            }
            Side::Right => {
                self.right_keys = keys;
                self.collect_candidates().await
            }
        }
    }

    /// Configured entities whose key types line up with either side.
    async fn collect_candidates(&mut self) -> Result<Step, WizardError> {
        let catalog = self.catalog;
        let mut candidates = Vec::new();

        for entity in catalog.iter() {
            let key_columns = self.entity_key_columns(entity).await?;

            if columns_align(&self.left_keys, &key_columns)
                || columns_align(&self.right_keys, &key_columns)
            {
                candidates.push(EntityCandidate {
                    entity,
                    key_columns,
                });
            }
        }

        if candidates.is_empty() {
            return Ok(Step::Finish(WizardOutcome::NothingToDo(
                "no configured entity has keys matching the selected columns".into(),
            )));
        }

        self.candidates = candidates;
        Ok(Step::Next(WizardState::SelectLeftEntity))
    }

    /// Primary key columns, else the configured key fields.
    async fn entity_key_columns(
        &self,
        entity: &ConfiguredEntity,
    ) -> Result<Vec<ColumnRow>, SchemaError> {
        let mut names = self.source.query_primary_keys(&entity.source_object).await?;
        if names.is_empty() {
            names = entity.key_fields.clone();
        }
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let columns = self.source.query_columns(&entity.source_object).await?;
        Ok(names
            .iter()
            .filter_map(|name| {
                columns
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .cloned()
            })
            .collect())
    }

    async fn select_entity(&mut self, side: Side) -> Step {
        let labels: Vec<String> = self.candidates.iter().map(|c| c.label()).collect();
        let title = format!("Select the {side} entity");
        let Some(choice) = self.prompter.select_one(&title, &labels).await else {
            return cancelled(side.pick(WizardState::SelectLeftEntity, WizardState::SelectRightEntity));
        };

        match side {
            Side::Left => {
                self.left_entity = Some(choice);
                Step::Next(WizardState::SelectRightEntity)
            }
            Side::Right => {
                self.right_entity = Some(choice);
                Step::Next(WizardState::SelectLeftEntityKeys)
            }
        }
    }

    async fn select_entity_keys(&mut self, side: Side) -> Step {
        let state = side.pick(
            WizardState::SelectLeftEntityKeys,
            WizardState::SelectRightEntityKeys,
        );
        let (entity_idx, linking_keys) = match side {
            Side::Left => (self.left_entity, &self.left_keys),
            Side::Right => (self.right_entity, &self.right_keys),
        };
        let Some(candidate) = entity_idx.and_then(|idx| self.candidates.get(idx)) else {
            return cancelled(state);
        };

        let labels: Vec<String> = candidate.key_columns.iter().map(|c| c.name.clone()).collect();
        let title = format!(
            "Select the {} key columns matching {}",
            candidate.entity.alias,
            linking_keys
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let chosen = self.prompter.select_many(&title, &labels).await;
        if chosen.is_empty() {
            return cancelled(state);
        }

        if chosen.len() != linking_keys.len() {
            warn!(
                expected = linking_keys.len(),
                selected = chosen.len(),
                "entity key count does not match linking keys"
            );
            self.prompter
                .notify(&format!(
                    "Select exactly {} column(s), one for each linking key.",
                    linking_keys.len()
                ))
                .await;
            return Step::Next(state);
        }

        let keys: Vec<String> = chosen
            .into_iter()
            .filter_map(|idx| labels.get(idx).cloned())
            .collect();
        match side {
            Side::Left => {
                self.left_entity_keys = keys;
                Step::Next(WizardState::SelectRightEntityKeys)
            }
            Side::Right => {
                self.right_entity_keys = keys;
                Step::Next(WizardState::Emit)
            }
        }
    }

    async fn emit(&mut self) -> Result<Step, WizardError> {
        let (Some(linking_table), Some(left), Some(right)) = (
            self.linking_table.clone(),
            self.left_entity.and_then(|idx| self.candidates.get(idx)),
            self.right_entity.and_then(|idx| self.candidates.get(idx)),
        ) else {
            return Ok(cancelled(WizardState::Emit));
        };

        let relationship = DiscoveredRelationship::through_linking_table(
            linking_table,
            (left.entity.source_object.clone(), self.left_entity_keys.clone()),
            self.left_keys.iter().map(|c| c.name.clone()).collect(),
            (right.entity.source_object.clone(), self.right_entity_keys.clone()),
            self.right_keys.iter().map(|c| c.name.clone()).collect(),
        );

        let source_alias = left.entity.alias.as_str();
        let target_alias = right.entity.alias.as_str();
        if self.catalog.has_relationship(
            source_alias,
            target_alias,
            &relationship.source_display_name,
            &relationship.target_display_name,
        ) {
            return Ok(Step::Finish(WizardOutcome::NothingToDo(format!(
                "{source_alias} already declares this relationship to {target_alias}"
            ))));
        }

        let update = UpdateRelationship::new(
            source_alias,
            target_alias,
            &relationship,
            &self.catalog.relationship_names(source_alias),
        )?;
        self.emitter.emit(&update).await?;

        info!(
            source = source_alias,
            target = target_alias,
            linking_table = ?update.linking_object.as_ref().map(|o| o.display()),
            "linking relationship added"
        );
        self.prompter
            .notify(&format!(
                "Added relationship `{}` from {source_alias} to {target_alias}.",
                update.relationship_name
            ))
            .await;

        self.applied = Some(update);
        Ok(Step::Next(WizardState::Done))
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn pick(self, left: WizardState, right: WizardState) -> WizardState {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

fn cancelled(state: WizardState) -> Step {
    info!(%state, "linking wizard cancelled");
    Step::Finish(WizardOutcome::Cancelled(state))
}
