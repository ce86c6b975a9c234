//! End-to-end workflows.
//!
//! A [`Session`] bundles the collaborators of one CLI invocation: the
//! schema source, the prompter and the emitter bound to a configuration
//! file. Each workflow reads the configuration fresh, before touching the
//! schema, and reports how it ended as an [`Outcome`]. Only configuration
//! and connectivity problems are errors.

use thiserror::Error;
use tracing::{info, warn};

use crate::discovery::{discover_all, DiscoveredRelationship};
use crate::emit::{EmitError, RelationshipEmitter, UpdateRelationship};
use crate::gateway::{ConfigError, EntityCatalog};
use crate::metadata::{SchemaError, SchemaSource};
use crate::prompt::Prompter;
use crate::reconcile::{for_source_alias, reconcile_with_report, sorted_for_display, ReconciledRelationship};
use crate::wizard::{LinkingTableWizard, WizardError, WizardOutcome};

/// Errors that abort a workflow.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The schema could not be read at all.
    #[error("schema unavailable: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// A relationship that could not be applied.
#[derive(Debug)]
pub struct EmitFailure {
    /// Selection-list label of the relationship.
    pub relationship: String,
    pub error: EmitError,
}

/// How a workflow ended.
#[derive(Debug)]
pub enum Outcome {
    /// Updates were run; each failure is independent of the others.
    Applied {
        applied: Vec<UpdateRelationship>,
        failures: Vec<EmitFailure>,
    },
    /// Nothing to offer. The message says why.
    NothingToDo(String),
    /// The user backed out.
    Cancelled,
}

impl Outcome {
    /// Single line describing the outcome.
    pub fn summary(&self) -> String {
        match self {
            Outcome::Applied { applied, failures } if failures.is_empty() => {
                format!("Added {} relationship(s).", applied.len())
            }
            Outcome::Applied { applied, failures } => format!(
                "Added {} relationship(s); {} failed.",
                applied.len(),
                failures.len()
            ),
            Outcome::NothingToDo(message) => message.clone(),
            Outcome::Cancelled => "Cancelled.".to_string(),
        }
    }
}

/// Options for [`Session::add_relationships`].
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Only relationships whose source is this entity.
    pub entity: Option<String>,
    /// Accept every unambiguous candidate without prompting.
    pub all: bool,
}

/// Collaborators for one invocation.
pub struct Session<'a> {
    source: &'a dyn SchemaSource,
    prompter: &'a dyn Prompter,
    emitter: &'a RelationshipEmitter,
}

impl<'a> Session<'a> {
    pub fn new(
        source: &'a dyn SchemaSource,
        prompter: &'a dyn Prompter,
        emitter: &'a RelationshipEmitter,
    ) -> Self {
        Self {
            source,
            prompter,
            emitter,
        }
    }

    fn load_catalog(&self) -> Result<EntityCatalog, SessionError> {
        Ok(EntityCatalog::load(self.emitter.config_file())?)
    }

    /// Fail once, up front, if the schema cannot be reached.
    async fn check_schema(&self) -> Result<(), SessionError> {
        self.source.query_foreign_keys().await?;
        Ok(())
    }

    /// Relationships that could be added, sorted for display.
    pub async fn discover(
        &self,
        entity: Option<&str>,
    ) -> Result<Vec<ReconciledRelationship>, SessionError> {
        let catalog = self.load_catalog()?;
        self.check_schema().await?;
        Ok(self.candidates(&catalog, entity).await)
    }

    async fn candidates(
        &self,
        catalog: &EntityCatalog,
        entity: Option<&str>,
    ) -> Vec<ReconciledRelationship> {
        let discovered: Vec<DiscoveredRelationship> = discover_all(self.source).await;
        let (reconciled, report) = reconcile_with_report(catalog, &discovered);
        info!(
            discovered = report.discovered,
            unresolved = report.unresolved,
            already_configured = report.already_configured,
            eligible = report.eligible,
            "reconciled relationships"
        );

        let reconciled = match entity {
            Some(alias) => for_source_alias(reconciled, alias),
            None => reconciled,
        };
        sorted_for_display(reconciled)
    }

    /// Discover, reconcile, let the user choose, and apply.
    pub async fn add_relationships(&self, options: &AddOptions) -> Result<Outcome, SessionError> {
        let catalog = self.load_catalog()?;
        if let Some(alias) = &options.entity {
            if catalog.get(alias).is_none() {
                return Ok(Outcome::NothingToDo(format!(
                    "Entity `{alias}` is not in the configuration."
                )));
            }
        }
        self.check_schema().await?;

        let candidates = self.candidates(&catalog, options.entity.as_deref()).await;
        if candidates.is_empty() {
            return Ok(Outcome::NothingToDo(
                "No new relationships to add.".to_string(),
            ));
        }

        let selected = if options.all {
            candidates
        } else {
            let labels: Vec<String> = candidates.iter().map(|c| c.label()).collect();
            let chosen = self
                .prompter
                .select_many("Select relationships to add", &labels)
                .await;
            chosen
                .into_iter()
                .filter_map(|idx| candidates.get(idx).cloned())
                .collect()
        };
        if selected.is_empty() {
            return Ok(Outcome::Cancelled);
        }

        let mut accepted = Vec::with_capacity(selected.len());
        for candidate in selected {
            if self.confirm_ambiguous(&candidate, options.all).await {
                accepted.push(candidate);
            }
        }
        if accepted.is_empty() {
            return Ok(Outcome::Cancelled);
        }

        Ok(self.apply(&catalog, &accepted).await)
    }

    /// Direct relationships matching neither primary key need a yes.
    async fn confirm_ambiguous(&self, candidate: &ReconciledRelationship, all: bool) -> bool {
        let relationship = &candidate.relationship;
        if relationship.is_linking() || !relationship.cardinality.is_ambiguous() {
            return true;
        }
        if all {
            info!(relationship = %candidate, "skipping ambiguous relationship");
            return false;
        }

        let title = format!(
            "{candidate}: the foreign key matches neither primary key. Add it anyway?"
        );
        let answer = self
            .prompter
            .select_one(&title, &["Add".to_string(), "Skip".to_string()])
            .await;
        answer == Some(0)
    }

    async fn apply(&self, catalog: &EntityCatalog, accepted: &[ReconciledRelationship]) -> Outcome {
        let mut applied: Vec<UpdateRelationship> = Vec::new();
        let mut failures = Vec::new();

        for candidate in accepted {
            let mut names = catalog.relationship_names(&candidate.source_alias);
            names.extend(
                applied
                    .iter()
                    .filter(|u| u.source_alias == candidate.source_alias)
                    .map(|u| u.relationship_name.as_str()),
            );

            let result = match UpdateRelationship::from_reconciled(candidate, &names) {
                Ok(update) => {
                    let emitted = self.emitter.emit(&update).await;
                    emitted.map(|_| update)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(update) => applied.push(update),
                Err(error) => {
                    warn!(relationship = %candidate, error = %error, "failed to add relationship");
                    failures.push(EmitFailure {
                        relationship: candidate.label(),
                        error,
                    });
                }
            }
        }

        Outcome::Applied { applied, failures }
    }

    /// Run the linking-table wizard.
    pub async fn link_tables(&self) -> Result<Outcome, SessionError> {
        let catalog = self.load_catalog()?;
        if catalog.is_empty() {
            return Ok(Outcome::NothingToDo(
                "The configuration declares no entities.".to_string(),
            ));
        }

        let wizard = LinkingTableWizard::new(self.source, &catalog, self.prompter, self.emitter);
        Ok(match wizard.run().await? {
            WizardOutcome::Applied(update) => Outcome::Applied {
                applied: vec![update],
                failures: Vec::new(),
            },
            WizardOutcome::Cancelled(_) => Outcome::Cancelled,
            WizardOutcome::NothingToDo(message) => Outcome::NothingToDo(message),
        })
    }
}
