//! Discovery against a schema snapshot.

use dabrel::discovery::{
    discover_all, discover_direct, discover_via_linking_tables, Cardinality,
    DiscoveredRelationship,
};
use dabrel::metadata::{SchemaSnapshot, SnapshotSource};
use dabrel::naming::SchemaObjectName;

const SCHEMA: &str = r#"{
  "tables": [
    {"schema": "dbo", "name": "authors",
     "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"schema": "dbo", "name": "publishers",
     "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"schema": "dbo", "name": "books",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "publisher_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_books_publisher", "columns": ["publisher_id"],
        "referenced_schema": "dbo", "referenced_table": "publishers", "referenced_columns": ["id"]}
     ]},
    {"schema": "dbo", "name": "books_authors",
     "columns": [
       {"name": "author_id", "position": 1, "data_type": "int"},
       {"name": "book_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["author_id", "book_id"]},
     "foreign_keys": [
       {"name": "FK_ba_author", "columns": ["author_id"],
        "referenced_schema": "dbo", "referenced_table": "authors", "referenced_columns": ["id"]},
       {"name": "FK_ba_book", "columns": ["book_id"],
        "referenced_schema": "dbo", "referenced_table": "books", "referenced_columns": ["id"]}
     ]},
    {"schema": "dbo", "name": "employees",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "manager_id", "position": 2, "data_type": "int", "is_nullable": true}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_employees_manager", "columns": ["manager_id"],
        "referenced_schema": "dbo", "referenced_table": "employees", "referenced_columns": ["id"]}
     ]},
    {"schema": "dbo", "name": "reports_to",
     "columns": [
       {"name": "manager_id", "position": 1, "data_type": "int"},
       {"name": "report_id", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["manager_id", "report_id"]},
     "foreign_keys": [
       {"name": "FK_rt_manager", "columns": ["manager_id"],
        "referenced_schema": "dbo", "referenced_table": "employees", "referenced_columns": ["id"]},
       {"name": "FK_rt_report", "columns": ["report_id"],
        "referenced_schema": "dbo", "referenced_table": "employees", "referenced_columns": ["id"]}
     ]},
    {"schema": "ops", "name": "airports",
     "columns": [{"name": "code", "position": 1, "data_type": "char(3)"}],
     "primary_key": {"columns": ["code"]}},
    {"schema": "ops", "name": "flights",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "origin_code", "position": 2, "data_type": "char(3)"},
       {"name": "destination_code", "position": 3, "data_type": "char(3)"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_flights_origin", "columns": ["origin_code"],
        "referenced_schema": "ops", "referenced_table": "airports", "referenced_columns": ["code"]},
       {"name": "FK_flights_destination", "columns": ["destination_code"],
        "referenced_schema": "ops", "referenced_table": "airports", "referenced_columns": ["code"]}
     ]},
    {"schema": "sales", "name": "order_lines",
     "columns": [
       {"name": "order_id", "position": 1, "data_type": "int"},
       {"name": "line_no", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["order_id", "line_no"]}},
    {"schema": "sales", "name": "shipments",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "order_id", "position": 2, "data_type": "int"},
       {"name": "line_no", "position": 3, "data_type": "int"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_shipments_line", "columns": ["order_id", "line_no"],
        "referenced_schema": "sales", "referenced_table": "order_lines",
        "referenced_columns": ["order_id", "line_no"]}
     ]},
    {"schema": "sales", "name": "line_details",
     "columns": [
       {"name": "order_id", "position": 1, "data_type": "int"},
       {"name": "line_no", "position": 2, "data_type": "int"}
     ],
     "primary_key": {"columns": ["line_no", "order_id"]},
     "foreign_keys": [
       {"name": "FK_details_line", "columns": ["order_id", "line_no"],
        "referenced_schema": "sales", "referenced_table": "order_lines",
        "referenced_columns": ["order_id", "line_no"]}
     ]}
  ]
}"#;

fn schema() -> SnapshotSource {
    let snapshot: SchemaSnapshot = serde_json::from_str(SCHEMA).unwrap();
    SnapshotSource::new(snapshot)
}

fn between<'a>(
    relationships: &'a [DiscoveredRelationship],
    source: &str,
    target: &str,
) -> Vec<&'a DiscoveredRelationship> {
    let source = SchemaObjectName::normalize(source);
    let target = SchemaObjectName::normalize(target);
    relationships
        .iter()
        .filter(|r| r.source_object == source && r.target_object == target)
        .collect()
}

// =============================================================================
// Direct relationships
// =============================================================================

#[tokio::test]
async fn test_direct_many_to_one() {
    let direct = discover_direct(&schema()).await;

    let found = between(&direct, "dbo.books", "dbo.publishers");
    assert_eq!(found.len(), 1);
    let books = found[0];
    assert_eq!(books.cardinality, Cardinality::ManyToOne);
    assert_eq!(books.source_columns, vec!["publisher_id"]);
    assert_eq!(books.target_columns, vec!["id"]);
    assert_eq!(books.source_display_name, "dbo.books[publisher_id]");
    assert_eq!(books.target_display_name, "dbo.publishers[id]");
    assert!(!books.is_linking());
}

#[tokio::test]
async fn test_self_references_are_excluded() {
    let direct = discover_direct(&schema()).await;

    assert!(direct.iter().all(|r| !r.is_self_reference()));
    assert!(between(&direct, "dbo.employees", "dbo.employees").is_empty());
}

#[tokio::test]
async fn test_two_constraints_between_same_tables_stay_separate() {
    let direct = discover_direct(&schema()).await;

    let flights = between(&direct, "ops.flights", "ops.airports");
    assert_eq!(flights.len(), 2);
    assert_eq!(flights[0].source_columns, vec!["origin_code"]);
    assert_eq!(flights[1].source_columns, vec!["destination_code"]);
    assert_ne!(flights[0].source_display_name, flights[1].source_display_name);
}

#[tokio::test]
async fn test_composite_key_keeps_declaration_order() {
    let direct = discover_direct(&schema()).await;

    let shipments = between(&direct, "sales.shipments", "sales.order_lines");
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0].source_columns, vec!["order_id", "line_no"]);
    assert_eq!(shipments[0].target_columns, vec!["order_id", "line_no"]);
    assert_eq!(shipments[0].cardinality, Cardinality::ManyToOne);
    assert_eq!(
        shipments[0].source_display_name,
        "sales.shipments[order_id,line_no]"
    );
}

#[tokio::test]
async fn test_key_order_does_not_affect_cardinality() {
    let direct = discover_direct(&schema()).await;

    let details = between(&direct, "sales.line_details", "sales.order_lines");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].cardinality, Cardinality::OneToOne);
}

// =============================================================================
// Linking tables
// =============================================================================

#[tokio::test]
async fn test_junction_yields_both_directions() {
    let linking = discover_via_linking_tables(&schema()).await;

    assert_eq!(linking.len(), 2);
    let forward = &linking[0];
    assert_eq!(forward.source_object.display(), "dbo.authors");
    assert_eq!(forward.target_object.display(), "dbo.books");
    assert_eq!(forward.cardinality, Cardinality::ManyToMany);
    assert_eq!(
        forward.linking_object.as_ref().map(|o| o.display()),
        Some("dbo.books_authors".to_string())
    );
    assert_eq!(forward.linking_source_columns, vec!["author_id"]);
    assert_eq!(forward.linking_target_columns, vec!["book_id"]);

    let backward = &linking[1];
    assert_eq!(backward.source_object.display(), "dbo.books");
    assert_eq!(backward.target_object.display(), "dbo.authors");
    assert_eq!(backward.linking_source_columns, vec!["book_id"]);
    assert_eq!(backward.linking_target_columns, vec!["author_id"]);
}

#[tokio::test]
async fn test_junction_to_one_table_is_not_discovered() {
    let linking = discover_via_linking_tables(&schema()).await;

    let reports_to = SchemaObjectName::normalize("dbo.reports_to");
    assert!(linking
        .iter()
        .all(|r| r.linking_object.as_ref() != Some(&reports_to)));
}

#[tokio::test]
async fn test_discover_all_puts_direct_first() {
    let source = schema();
    let direct = discover_direct(&source).await;
    let all = discover_all(&source).await;

    assert_eq!(all.len(), direct.len() + 2);
    assert!(all[..direct.len()].iter().all(|r| !r.is_linking()));
    assert!(all[direct.len()..].iter().all(|r| r.is_linking()));
}

#[tokio::test]
async fn test_relationship_serializes_without_empty_linking_fields() {
    let direct = discover_direct(&schema()).await;
    let books = between(&direct, "dbo.books", "dbo.publishers")[0];

    let value = serde_json::to_value(books).unwrap();
    assert_eq!(value["cardinality"], "many-to-one");
    assert!(value.get("linking_object").is_none());
    assert!(value.get("linking_source_columns").is_none());
}
