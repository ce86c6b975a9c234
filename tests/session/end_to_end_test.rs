//! Whole workflows: configuration file, schema snapshot, prompts, emitted commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dabrel::emit::{ExecutorPool, RecordingExecutor, RelationshipEmitter};
use dabrel::metadata::{
    ColumnRow, ForeignKeyRow, SchemaError, SchemaResult, SchemaSnapshot, SchemaSource,
    SnapshotSource,
};
use dabrel::naming::SchemaObjectName;
use dabrel::prompt::ScriptedPrompter;
use dabrel::worker::WorkerError;
use dabrel::{AddOptions, ConfigError, EntityCatalog, Outcome, Session, SessionError};
use tempfile::TempDir;

const SCHEMA: &str = r#"{
  "tables": [
    {"name": "authors", "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"name": "editions",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "isbn", "position": 2, "data_type": "varchar(13)"}
     ],
     "primary_key": {"columns": ["id"]}},
    {"name": "books",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "isbn", "position": 2, "data_type": "varchar(13)"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_books_edition", "columns": ["isbn"],
        "referenced_table": "editions", "referenced_columns": ["isbn"]}
     ]},
    {"name": "books_authors",
     "columns": [
       {"name": "author_id", "position": 1, "data_type": "int"},
       {"name": "book_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["author_id", "book_id"]},
     "foreign_keys": [
       {"name": "FK_ba_author", "columns": ["author_id"],
        "referenced_table": "authors", "referenced_columns": ["id"]},
       {"name": "FK_ba_book", "columns": ["book_id"],
        "referenced_table": "books", "referenced_columns": ["id"]}
     ]}
  ]
}"#;

const CONFIG: &str = r#"{
  "$schema": "https://example.invalid/dab.draft.schema.json",
  "data-source": {"database-type": "mssql", "connection-string": "@env('LIBRARY_DB')"},
  "entities": {
    "Author": {"source": {"object": "dbo.authors", "type": "table"}},
    "Book": {"source": {"object": "dbo.books", "type": "table"}},
    "Edition": {"source": "dbo.editions"}
  }
}"#;

const AUTHOR_BOOKS: &str = "Author -> Book (many-to-many via dbo.books_authors) [id -> id]";
const BOOK_EDITION: &str = "Book -> Edition (many-to-many) [isbn -> isbn]";

fn schema() -> SnapshotSource {
    let snapshot: SchemaSnapshot = serde_json::from_str(SCHEMA).unwrap();
    SnapshotSource::new(snapshot)
}

fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dab-config.json");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn emitter(recorder: &Arc<RecordingExecutor>, config: &Path) -> RelationshipEmitter {
    RelationshipEmitter::new(ExecutorPool::fixed(recorder.clone()), config)
}

/// Arguments before `--config <path>`.
fn without_config(args: &[String]) -> String {
    args[..args.len() - 2].join(" ")
}

struct Unreachable;

#[async_trait]
impl SchemaSource for Unreachable {
    async fn query_foreign_keys(&self) -> SchemaResult<Vec<ForeignKeyRow>> {
        Err(SchemaError::Worker(WorkerError::WorkerExited))
    }

    async fn query_primary_keys(&self, _table: &SchemaObjectName) -> SchemaResult<Vec<String>> {
        Err(SchemaError::Worker(WorkerError::WorkerExited))
    }

    async fn query_columns(&self, _table: &SchemaObjectName) -> SchemaResult<Vec<ColumnRow>> {
        Err(SchemaError::Worker(WorkerError::WorkerExited))
    }
}

// =============================================================================
// discover
// =============================================================================

#[tokio::test]
async fn test_discover_lists_candidates_sorted() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let candidates = session.discover(None).await.unwrap();

    let labels: Vec<String> = candidates.iter().map(|c| c.label()).collect();
    assert_eq!(
        labels,
        vec![
            AUTHOR_BOOKS.to_string(),
            "Book -> Author (many-to-many via dbo.books_authors) [id -> id]".to_string(),
            BOOK_EDITION.to_string(),
        ]
    );

    let authors = session.discover(Some("Author")).await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].target_alias, "Book");
}

#[tokio::test]
async fn test_missing_config_fails_before_schema() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("missing.json");
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();

    let session = Session::new(&Unreachable, &prompter, &emitter);
    let result = session.discover(None).await;

    assert!(matches!(
        result,
        Err(SessionError::Config(ConfigError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_unreachable_schema_is_fatal() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();

    let session = Session::new(&Unreachable, &prompter, &emitter);
    let result = session.add_relationships(&AddOptions::default()).await;

    assert!(matches!(result, Err(SessionError::Schema(_))));
    assert!(prompter.prompts().await.is_empty());
}

// =============================================================================
// add
// =============================================================================

#[tokio::test]
async fn test_add_selected_linking_relationship() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new().answer([AUTHOR_BOOKS]);
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let outcome = session
        .add_relationships(&AddOptions::default())
        .await
        .unwrap();

    let Outcome::Applied { applied, failures } = &outcome else {
        panic!("expected applied relationships");
    };
    assert!(failures.is_empty());
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].relationship_name, "books");
    assert_eq!(outcome.summary(), "Added 1 relationship(s).");

    let commands = recorder.commands().await;
    assert_eq!(commands.len(), 1);
    assert_eq!(
        without_config(&commands[0]),
        "update Author --relationship books --cardinality many --target.entity Book \
         --relationship.fields id:id --linking.object dbo.books_authors \
         --linking.source.fields author_id --linking.target.fields book_id"
    );
    assert_eq!(commands[0].last(), Some(&config.display().to_string()));
    assert_eq!(prompter.prompts().await, vec!["Select relationships to add"]);
}

#[tokio::test]
async fn test_add_all_skips_ambiguous() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let options = AddOptions {
        entity: None,
        all: true,
    };
    let outcome = session.add_relationships(&options).await.unwrap();

    let Outcome::Applied { applied, failures } = outcome else {
        panic!("expected applied relationships");
    };
    assert!(failures.is_empty());
    let names: Vec<(&str, &str)> = applied
        .iter()
        .map(|u| (u.source_alias.as_str(), u.relationship_name.as_str()))
        .collect();
    assert_eq!(names, vec![("Author", "books"), ("Book", "authors")]);
    assert_eq!(recorder.commands().await.len(), 2);
    assert!(prompter.prompts().await.is_empty());
}

#[tokio::test]
async fn test_ambiguous_needs_confirmation() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new().answer([BOOK_EDITION]).answer(["Add"]);
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let outcome = session
        .add_relationships(&AddOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Applied { ref applied, .. } if applied.len() == 1));
    let prompts = prompter.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].starts_with(BOOK_EDITION));

    let commands = recorder.commands().await;
    assert_eq!(
        without_config(&commands[0]),
        "update Book --relationship editions --cardinality many --target.entity Edition \
         --relationship.fields isbn:isbn"
    );
}

#[tokio::test]
async fn test_skipping_only_candidate_cancels() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new().answer([BOOK_EDITION]).answer(["Skip"]);
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let outcome = session
        .add_relationships(&AddOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Cancelled));
    assert!(recorder.commands().await.is_empty());
}

#[tokio::test]
async fn test_empty_selection_cancels() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new().cancel();
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let outcome = session
        .add_relationships(&AddOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Cancelled));
    assert_eq!(outcome.summary(), "Cancelled.");
}

#[tokio::test]
async fn test_partial_failure_is_collected() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab").failing_on("books"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let options = AddOptions {
        entity: None,
        all: true,
    };
    let outcome = session.add_relationships(&options).await.unwrap();

    let Outcome::Applied { applied, failures } = &outcome else {
        panic!("expected applied relationships");
    };
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].relationship_name, "authors");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].relationship, AUTHOR_BOOKS);
    assert_eq!(outcome.summary(), "Added 1 relationship(s); 1 failed.");
    assert_eq!(recorder.commands().await.len(), 2);
}

#[tokio::test]
async fn test_no_entities_is_nothing_to_do() {
    let (_dir, config) = write_config(r#"{"entities": {}}"#);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);

    let outcome = session
        .add_relationships(&AddOptions::default())
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::NothingToDo(_)));

    let outcome = session.link_tables().await.unwrap();
    assert!(matches!(outcome, Outcome::NothingToDo(_)));
    assert!(prompter.prompts().await.is_empty());
}

#[tokio::test]
async fn test_unknown_entity_is_nothing_to_do() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();

    let session = Session::new(&Unreachable, &prompter, &emitter);
    let options = AddOptions {
        entity: Some("Publisher".to_string()),
        all: false,
    };
    let outcome = session.add_relationships(&options).await.unwrap();

    assert!(
        matches!(outcome, Outcome::NothingToDo(ref message) if message.contains("Publisher"))
    );
}

// =============================================================================
// link
// =============================================================================

#[tokio::test]
async fn test_link_through_session() {
    let (_dir, config) = write_config(CONFIG);
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new()
        .answer(["dbo.books_authors"])
        .answer(["book_id"])
        .answer(["author_id"])
        .answer(["Book (dbo.books)"])
        .answer(["Author (dbo.authors)"])
        .answer(["id"])
        .answer(["id"]);
    let source = schema();

    let session = Session::new(&source, &prompter, &emitter);
    let outcome = session.link_tables().await.unwrap();

    assert!(matches!(outcome, Outcome::Applied { ref applied, .. } if applied.len() == 1));
    let commands = recorder.commands().await;
    assert_eq!(
        without_config(&commands[0]),
        "update Book --relationship authors --cardinality many --target.entity Author \
         --relationship.fields id:id --linking.object dbo.books_authors \
         --linking.source.fields book_id --linking.target.fields author_id"
    );
}

// =============================================================================
// default schema
// =============================================================================

const POSTGRES_CONFIG: &str = r#"{
  "data-source": {"database-type": "postgresql", "connection-string": "host=db dbname=library"},
  "entities": {
    "Author": {"source": "authors"},
    "Book": {"source": "public.books"}
  }
}"#;

#[tokio::test]
async fn test_unqualified_snapshot_follows_configuration_schema() {
    let (dir, config) = write_config(POSTGRES_CONFIG);
    let snapshot = dir.path().join("schema.json");
    fs::write(&snapshot, SCHEMA).unwrap();

    let catalog = EntityCatalog::load(&config).unwrap();
    assert_eq!(catalog.default_schema(), "public");

    let source = SnapshotSource::from_file(&snapshot, catalog.default_schema()).unwrap();
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let session = Session::new(&source, &prompter, &emitter);

    let options = AddOptions {
        entity: None,
        all: true,
    };
    let outcome = session.add_relationships(&options).await.unwrap();
    let applied = match outcome {
        Outcome::Applied { applied, failures } if failures.is_empty() => applied,
        other => panic!("expected applied relationships, got {other:?}"),
    };

    assert_eq!(applied.len(), 2);
    for update in &applied {
        assert_eq!(
            update.linking_object.as_ref().map(|o| o.display()),
            Some("public.books_authors".to_string())
        );
    }
}

#[tokio::test]
async fn test_mismatched_default_schema_resolves_nothing() {
    let (dir, config) = write_config(POSTGRES_CONFIG);
    let snapshot = dir.path().join("schema.json");
    fs::write(&snapshot, SCHEMA).unwrap();

    // Tables land in dbo while the entities live in public.
    let source = SnapshotSource::from_file(&snapshot, "dbo").unwrap();
    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = emitter(&recorder, &config);
    let prompter = ScriptedPrompter::new();
    let session = Session::new(&source, &prompter, &emitter);

    assert!(session.discover(None).await.unwrap().is_empty());
}
