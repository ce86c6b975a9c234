//! Accepted relationships written back the way the gateway CLI writes them
//! are not offered again.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use dabrel::discovery::discover_all;
use dabrel::emit::{ExecutorPool, RecordingExecutor, RelationshipEmitter, UpdateRelationship};
use dabrel::gateway::EntityCatalog;
use dabrel::metadata::{SchemaSnapshot, SnapshotSource};
use dabrel::prompt::ScriptedPrompter;
use dabrel::reconcile::reconcile;
use dabrel::{AddOptions, Outcome, Session};
use serde_json::{json, Value};

const SCHEMA: &str = r#"{
  "tables": [
    {"name": "customers", "columns": [{"name": "id", "position": 1, "data_type": "int"}],
     "primary_key": {"columns": ["id"]}},
    {"name": "products", "columns": [{"name": "sku", "position": 1, "data_type": "varchar(20)"}],
     "primary_key": {"columns": ["sku"]}},
    {"name": "orders",
     "columns": [
       {"name": "id", "position": 1, "data_type": "int"},
       {"name": "customer_id", "position": 2, "data_type": "int"},
       {"name": "billing_customer_id", "position": 3, "data_type": "int"}
     ],
     "primary_key": {"columns": ["id"]},
     "foreign_keys": [
       {"name": "FK_orders_customer", "columns": ["customer_id"],
        "referenced_table": "customers", "referenced_columns": ["id"]},
       {"name": "FK_orders_billing", "columns": ["billing_customer_id"],
        "referenced_table": "customers", "referenced_columns": ["id"]}
     ]},
    {"name": "order_products",
     "columns": [
       {"name": "order_id", "position": 1, "data_type": "int"},
       {"name": "product_sku", "position": 2, "data_type": "varchar(20)"}
     ],
     "primary_key": {"columns": ["order_id", "product_sku"]},
     "foreign_keys": [
       {"name": "FK_op_order", "columns": ["order_id"],
        "referenced_table": "orders", "referenced_columns": ["id"]},
       {"name": "FK_op_product", "columns": ["product_sku"],
        "referenced_table": "products", "referenced_columns": ["sku"]}
     ]}
  ]
}"#;

const CONFIG: &str = r#"{
  "data-source": {"database-type": "mssql", "connection-string": "Server=.;Database=shop"},
  "entities": {
    "Order": {"source": {"object": "dbo.orders", "type": "table"}},
    "Customer": {"source": {"object": "dbo.customers", "type": "table"}},
    "Product": {"source": {"object": "dbo.products", "type": "table"}}
  }
}"#;

fn schema() -> SnapshotSource {
    let snapshot: SchemaSnapshot = serde_json::from_str(SCHEMA).unwrap();
    SnapshotSource::new(snapshot)
}

fn split_list(fields: Option<&str>) -> Vec<String> {
    fields
        .map(|f| f.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Add the relationship to the file as flat dotted keys.
fn write_back(path: &Path, update: &UpdateRelationship) {
    let mut document: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    let (source_fields, target_fields): (Vec<&str>, Vec<&str>) = update
        .relationship_fields
        .split(',')
        .map(|pair| pair.split_once(':').unwrap())
        .unzip();

    let mut relationship = json!({
        "cardinality": update.cardinality.as_str(),
        "target.entity": update.target_alias,
        "source.fields": source_fields,
        "target.fields": target_fields,
    });
    if let Some(linking) = &update.linking_object {
        relationship["linking.object"] = json!(linking.display());
        relationship["linking.source.fields"] =
            json!(split_list(update.linking_source_fields.as_deref()));
        relationship["linking.target.fields"] =
            json!(split_list(update.linking_target_fields.as_deref()));
    }

    document["entities"][&update.source_alias]["relationships"][&update.relationship_name] =
        relationship;
    fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
}

#[tokio::test]
async fn test_accepted_relationship_is_not_offered_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dab-config.json");
    fs::write(&path, CONFIG).unwrap();

    let discovered = discover_all(&schema()).await;
    let before = reconcile(&EntityCatalog::load(&path).unwrap(), &discovered);
    let accepted = before
        .iter()
        .find(|r| r.relationship.source_columns == vec!["customer_id"])
        .unwrap();

    let update = UpdateRelationship::from_reconciled(accepted, &[]).unwrap();
    assert_eq!(update.relationship_name, "customer");
    write_back(&path, &update);

    let after = reconcile(&EntityCatalog::load(&path).unwrap(), &discovered);
    assert_eq!(after.len(), before.len() - 1);
    assert!(!after.contains(accepted));

    // The second key between the same tables is still offered.
    assert!(after
        .iter()
        .any(|r| r.relationship.source_columns == vec!["billing_customer_id"]));
}

#[tokio::test]
async fn test_second_key_gets_a_suffixed_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dab-config.json");
    fs::write(&path, CONFIG).unwrap();

    let discovered = discover_all(&schema()).await;
    let catalog = EntityCatalog::load(&path).unwrap();
    let orders: Vec<_> = reconcile(&catalog, &discovered)
        .into_iter()
        .filter(|r| r.source_alias == "Order" && r.target_alias == "Customer")
        .collect();
    assert_eq!(orders.len(), 2);

    let first = UpdateRelationship::from_reconciled(&orders[0], &[]).unwrap();
    write_back(&path, &first);

    let catalog = EntityCatalog::load(&path).unwrap();
    let second =
        UpdateRelationship::from_reconciled(&orders[1], &catalog.relationship_names("Order"))
            .unwrap();
    assert_eq!(first.relationship_name, "customer");
    assert_eq!(second.relationship_name, "customer_2");
}

#[tokio::test]
async fn test_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dab-config.json");
    fs::write(&path, CONFIG).unwrap();

    let recorder = Arc::new(RecordingExecutor::new("dab"));
    let emitter = RelationshipEmitter::new(ExecutorPool::fixed(recorder.clone()), &path);
    let prompter = ScriptedPrompter::new();
    let source = schema();
    let session = Session::new(&source, &prompter, &emitter);

    let options = AddOptions {
        entity: None,
        all: true,
    };
    let Outcome::Applied { applied, failures } = session.add_relationships(&options).await.unwrap()
    else {
        panic!("expected applied relationships");
    };
    assert!(failures.is_empty());
    assert_eq!(applied.len(), 4);

    let order_names: Vec<&str> = applied
        .iter()
        .filter(|u| u.source_alias == "Order")
        .map(|u| u.relationship_name.as_str())
        .collect();
    assert_eq!(order_names, vec!["customer", "customer_2", "products"]);

    for update in &applied {
        write_back(&path, update);
    }

    assert!(session.discover(None).await.unwrap().is_empty());
    let outcome = session.add_relationships(&options).await.unwrap();
    assert!(matches!(outcome, Outcome::NothingToDo(_)));
    assert_eq!(recorder.commands().await.len(), 4);
}
