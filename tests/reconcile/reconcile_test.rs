//! Reconciliation of discovered relationships with a gateway configuration.

use dabrel::discovery::discover_all;
use dabrel::emit::UpdateRelationship;
use dabrel::gateway::EntityCatalog;
use dabrel::metadata::{SchemaSnapshot, SnapshotSource};
use dabrel::reconcile::{
    for_source_alias, reconcile, reconcile_with_report, sorted_for_display, ReconcileReport,
};
use insta::assert_snapshot;

const SCHEMA: &str = r#"{
  "tables": [
    {"name": "authors", "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"name": "publishers", "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"name": "books",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "publisher_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_books_publisher", "columns": ["publisher_id"],
        "referenced_table": "publishers", "referenced_columns": ["id"]}
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
     ]},
    {"name": "reviews",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "book_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_reviews_book", "columns": ["book_id"],
        "referenced_table": "books", "referenced_columns": ["id"]}
     ]}
  ]
}"#;

const CONFIG: &str = r#"{
  "data-source": {"database-type": "mssql", "connection-string": "Server=.;Database=library"},
  "entities": {
    "Book": {
      "source": {"object": "dbo.books", "type": "table"},
      "relationships": {
        "publisher": {
          "cardinality": "one",
          "target.entity": "Publisher",
          "source.fields": ["publisher_id"],
          "target.fields": ["id"]
        }
      }
    },
    "Author": {"source": "[dbo].[Authors]"},
    "Publisher": {"source": "publishers"}
  }
}"#;

fn schema() -> SnapshotSource {
    let snapshot: SchemaSnapshot = serde_json::from_str(SCHEMA).unwrap();
    SnapshotSource::new(snapshot)
}

fn catalog(json: &str) -> EntityCatalog {
    EntityCatalog::from_json_str(json).unwrap()
}

#[tokio::test]
async fn test_only_resolvable_new_relationships_remain() {
    let discovered = discover_all(&schema()).await;
    let catalog = catalog(CONFIG);

    let reconciled = reconcile(&catalog, &discovered);

    assert_eq!(reconciled.len(), 2);
    for candidate in &reconciled {
        assert!(catalog.get(&candidate.source_alias).is_some());
        assert!(catalog.get(&candidate.target_alias).is_some());
        assert!(!candidate.already_configured);
        assert!(discovered.contains(&candidate.relationship));
    }
}

#[tokio::test]
async fn test_report_counts() {
    let discovered = discover_all(&schema()).await;
    let (_, report) = reconcile_with_report(&catalog(CONFIG), &discovered);

    // books->publishers is configured; books_authors and reviews are not entities.
    assert_eq!(
        report,
        ReconcileReport {
            discovered: 6,
            unresolved: 3,
            already_configured: 1,
            eligible: 2,
        }
    );
}

#[tokio::test]
async fn test_linking_records_are_kept_in_both_directions() {
    let discovered = discover_all(&schema()).await;
    let reconciled = reconcile(&catalog(CONFIG), &discovered);

    let labels: Vec<String> = reconciled.iter().map(|r| r.label()).collect();
    assert_snapshot!(labels.join("\n"), @r"
    Author -> Book (many-to-many via dbo.books_authors) [id -> id]
    Book -> Author (many-to-many via dbo.books_authors) [id -> id]
    ");
}

#[tokio::test]
async fn test_same_tables_different_columns_is_new() {
    let config = r#"{
      "entities": {
        "Book": {
          "source": "dbo.books",
          "relationships": {
            "editor": {
              "cardinality": "one",
              "target.entity": "Publisher",
              "source.fields": ["editor_id"],
              "target.fields": ["id"]
            }
          }
        },
        "Publisher": {"source": "dbo.publishers"}
      }
    }"#;
    let discovered = discover_all(&schema()).await;
    let reconciled = reconcile(&catalog(config), &discovered);

    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].source_alias, "Book");
    assert_eq!(reconciled[0].target_alias, "Publisher");
    assert_eq!(
        reconciled[0].relationship.source_display_name,
        "dbo.books[publisher_id]"
    );
}

#[tokio::test]
async fn test_reconcile_is_idempotent_after_applying() {
    let discovered = discover_all(&schema()).await;
    let mut catalog = catalog(CONFIG);

    let first = reconcile(&catalog, &discovered);
    assert!(!first.is_empty());

    for candidate in &first {
        let update = {
            let names = catalog.relationship_names(&candidate.source_alias);
            UpdateRelationship::from_reconciled(candidate, &names).unwrap()
        };
        assert!(catalog.insert_relationship(&candidate.source_alias, update.to_configured()));
    }

    assert!(reconcile(&catalog, &discovered).is_empty());
}

#[tokio::test]
async fn test_no_entities_reconciles_to_nothing() {
    let discovered = discover_all(&schema()).await;
    assert!(!discovered.is_empty());

    let reconciled = reconcile(&catalog(r#"{"entities": {}}"#), &discovered);
    assert!(reconciled.is_empty());
}

#[tokio::test]
async fn test_filter_and_sort_for_display() {
    let discovered = discover_all(&schema()).await;
    let reconciled = reconcile(&catalog(CONFIG), &discovered);

    let sorted = sorted_for_display(reconciled.clone());
    let order: Vec<&str> = sorted.iter().map(|r| r.source_alias.as_str()).collect();
    assert_eq!(order, vec!["Author", "Book"]);

    let books = for_source_alias(reconciled, "Book");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].target_alias, "Author");
}
