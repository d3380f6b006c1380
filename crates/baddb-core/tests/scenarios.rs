//! End-to-end scenarios driven through the emulator facade, with time under
//! test control.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use baddb_core::{Baddb, BaddbConfig, BaddbError, CONTROL_TABLE_NAME, ManualClock};
use baddb_model::AttributeValue;
use baddb_model::input::{
    BatchWriteItemInput, CreateGlobalSecondaryIndexAction, CreateTableInput, DeleteItemInput,
    GetItemInput, GlobalSecondaryIndexUpdate, PutItemInput, PutRequest as WirePutRequest,
    QueryInput, ScanInput, TransactPut, TransactWriteItem, TransactWriteItemsInput,
    UpdateItemInput, UpdateTableInput, WriteRequest,
};
use baddb_model::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ProvisionedThroughput, ScalarAttributeType,
};

// ---------------------------------------------------------------------------
// Harness helpers
// ---------------------------------------------------------------------------

fn emulator() -> (Baddb, ManualClock) {
    let clock = ManualClock::default();
    let db = Baddb::with_clock(BaddbConfig::default(), Arc::new(clock.clone()));
    (db, clock)
}

fn attr_map(value: serde_json::Value) -> HashMap<String, AttributeValue> {
    serde_json::from_value(value).expect("valid wire item")
}

fn key_schema_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement {
        attribute_name: name.to_owned(),
        key_type,
    }
}

fn attribute_definition(name: &str, attribute_type: ScalarAttributeType) -> AttributeDefinition {
    AttributeDefinition {
        attribute_name: name.to_owned(),
        attribute_type,
    }
}

/// Creates the movie table from the scenarios: pk `year` (N), sk `title`
/// (S), pay-per-request.
fn create_movie_table(db: &Baddb, gsis: Vec<GlobalSecondaryIndex>) {
    db.create_table(CreateTableInput {
        table_name: "t".to_owned(),
        key_schema: vec![
            key_schema_element("year", KeyType::Hash),
            key_schema_element("title", KeyType::Range),
        ],
        attribute_definitions: vec![
            attribute_definition("year", ScalarAttributeType::N),
            attribute_definition("title", ScalarAttributeType::S),
            attribute_definition("regionCode", ScalarAttributeType::S),
            attribute_definition("countryCode", ScalarAttributeType::S),
        ],
        global_secondary_indexes: gsis,
        ..CreateTableInput::default()
    })
    .expect("table created");
}

/// Sets a table's knobs through the reserved control table.
fn set_knobs(
    db: &Baddb,
    table: &str,
    table_delay: Option<i64>,
    gsi_delay: Option<i64>,
    unprocessed: Option<i64>,
) {
    let mut item = HashMap::new();
    item.insert(
        "tableName".to_owned(),
        AttributeValue::S(table.to_owned()),
    );
    if let Some(seconds) = table_delay {
        item.insert(
            "tableDelaySeconds".to_owned(),
            AttributeValue::N(seconds.to_string()),
        );
    }
    if let Some(seconds) = gsi_delay {
        item.insert(
            "gsiDelaySeconds".to_owned(),
            AttributeValue::N(seconds.to_string()),
        );
    }
    if let Some(count) = unprocessed {
        item.insert(
            "unprocessedRequests".to_owned(),
            AttributeValue::N(count.to_string()),
        );
    }
    db.put_item(PutItemInput {
        table_name: CONTROL_TABLE_NAME.to_owned(),
        item,
        ..PutItemInput::default()
    })
    .expect("control write accepted");
}

fn put(db: &Baddb, item: serde_json::Value) {
    db.put_item(PutItemInput {
        table_name: "t".to_owned(),
        item: attr_map(item),
        ..PutItemInput::default()
    })
    .expect("put accepted");
}

fn get(db: &Baddb, key: serde_json::Value, consistent: bool) -> Option<baddb_model::Entry> {
    db.get_item(GetItemInput {
        table_name: "t".to_owned(),
        key: attr_map(key),
        consistent_read: Some(consistent),
        ..GetItemInput::default()
    })
    .expect("get accepted")
}

fn movie_key() -> serde_json::Value {
    json!({"year": {"N": "2025"}, "title": {"S": "Hello"}})
}

// ---------------------------------------------------------------------------
// S1 -- put/get/delete under both consistency modes
// ---------------------------------------------------------------------------

#[test]
fn test_should_lag_stale_reads_behind_writes_and_deletes() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());
    set_knobs(&db, "t", Some(5), None, None);

    put(
        &db,
        json!({"year": {"N": "2025"}, "title": {"S": "Hello"}, "message": {"S": "a"}}),
    );

    // The write is immediately visible to a consistent read but hidden from
    // a stale read for five seconds.
    assert!(get(&db, movie_key(), true).is_some());
    assert!(get(&db, movie_key(), false).is_none());
    clock.advance(Duration::seconds(6));
    assert!(get(&db, movie_key(), false).is_some());

    db.delete_item(DeleteItemInput {
        table_name: "t".to_owned(),
        key: attr_map(movie_key()),
        ..DeleteItemInput::default()
    })
    .expect("delete accepted");

    // The tombstone follows the same staleness rules.
    assert!(get(&db, movie_key(), true).is_none());
    let stale = get(&db, movie_key(), false).expect("stale read sees the old version");
    assert_eq!(stale.get("message"), Some(&AttributeValue::S("a".to_owned())));
    clock.advance(Duration::seconds(6));
    assert!(get(&db, movie_key(), false).is_none());
}

// ---------------------------------------------------------------------------
// S2 -- conditional put
// ---------------------------------------------------------------------------

#[test]
fn test_should_enforce_put_conditions() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());

    put(
        &db,
        json!({"year": {"N": "2025"}, "title": {"S": "Hello"}, "message": {"S": "a"}}),
    );

    // The item exists, so attribute_not_exists(title) fails.
    let result = db.put_item(PutItemInput {
        table_name: "t".to_owned(),
        item: attr_map(
            json!({"year": {"N": "2025"}, "title": {"S": "Hello"}, "regionCode": {"S": "1"}}),
        ),
        condition_expression: Some("attribute_not_exists(title)".to_owned()),
        ..PutItemInput::default()
    });
    assert!(matches!(result, Err(BaddbError::ConditionalCheckFailed)));

    // A condition over an absent attribute and the message content passes.
    db.put_item(PutItemInput {
        table_name: "t".to_owned(),
        item: attr_map(
            json!({"year": {"N": "2025"}, "title": {"S": "Hello"}, "regionCode": {"S": "1"}}),
        ),
        condition_expression: Some(
            "attribute_not_exists(foo) AND contains(message, :m)".to_owned(),
        ),
        expression_attribute_values: attr_map(json!({":m": {"S": "a"}})),
        ..PutItemInput::default()
    })
    .expect("condition passes");

    let stored = get(&db, movie_key(), true).expect("item present");
    assert_eq!(
        stored.get("regionCode"),
        Some(&AttributeValue::S("1".to_owned()))
    );
}

// ---------------------------------------------------------------------------
// S3 -- update ADD and DELETE on numbers and sets
// ---------------------------------------------------------------------------

#[test]
fn test_should_update_numbers_and_sets() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());

    put(
        &db,
        json!({
            "year": {"N": "2025"},
            "title": {"S": "Hello"},
            "views": {"N": "100"},
            "tags": {"SS": ["a", "b"]}
        }),
    );

    let result = db
        .update_item(UpdateItemInput {
            table_name: "t".to_owned(),
            key: attr_map(movie_key()),
            update_expression: Some("ADD views :d".to_owned()),
            expression_attribute_values: attr_map(json!({":d": {"N": "10"}})),
            ..UpdateItemInput::default()
        })
        .expect("numeric add applies");
    assert_eq!(
        result.new.get("views"),
        Some(&AttributeValue::N("110".to_owned()))
    );

    let result = db
        .update_item(UpdateItemInput {
            table_name: "t".to_owned(),
            key: attr_map(movie_key()),
            update_expression: Some("DELETE tags :r".to_owned()),
            expression_attribute_values: attr_map(json!({":r": {"SS": ["b"]}})),
            ..UpdateItemInput::default()
        })
        .expect("set delete applies");
    assert_eq!(
        result.new.get("tags"),
        Some(&AttributeValue::Ss(vec!["a".to_owned()]))
    );

    // Adding a number to a string set is a type mismatch, and the entry is
    // left untouched.
    let result = db.update_item(UpdateItemInput {
        table_name: "t".to_owned(),
        key: attr_map(movie_key()),
        update_expression: Some("ADD tags :bad".to_owned()),
        expression_attribute_values: attr_map(json!({":bad": {"N": "1"}})),
        ..UpdateItemInput::default()
    });
    assert!(matches!(result, Err(BaddbError::Validation { .. })));
    let stored = get(&db, movie_key(), true).expect("item present");
    assert_eq!(
        stored.get("tags"),
        Some(&AttributeValue::Ss(vec!["a".to_owned()]))
    );
}

// ---------------------------------------------------------------------------
// S4 -- query with a sort-key range
// ---------------------------------------------------------------------------

#[test]
fn test_should_query_sort_key_range_in_order() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());

    for i in 0..4 {
        put(
            &db,
            json!({"year": {"N": "2025"}, "title": {"S": format!("Hello World {i}")}}),
        );
    }
    clock.advance(Duration::seconds(1));

    let result = db
        .query(QueryInput {
            table_name: "t".to_owned(),
            key_condition_expression: Some("year = :y AND title BETWEEN :l AND :r".to_owned()),
            expression_attribute_values: attr_map(json!({
                ":y": {"N": "2025"},
                ":l": {"S": "Hello World 1"},
                ":r": {"S": "Hello World 2"}
            })),
            scan_index_forward: Some(true),
            ..QueryInput::default()
        })
        .expect("query accepted");

    let titles: Vec<_> = result
        .entries
        .iter()
        .filter_map(|e| e.get("title").and_then(AttributeValue::as_s))
        .collect();
    assert_eq!(titles, vec!["Hello World 1", "Hello World 2"]);
    assert_eq!(result.scanned_count, 2);
}

// ---------------------------------------------------------------------------
// S5 -- GSI query with limit and reverse order
// ---------------------------------------------------------------------------

fn region_gsi() -> GlobalSecondaryIndex {
    GlobalSecondaryIndex {
        index_name: "regionGSI".to_owned(),
        key_schema: vec![
            key_schema_element("regionCode", KeyType::Hash),
            key_schema_element("countryCode", KeyType::Range),
        ],
        projection: Projection {
            projection_type: ProjectionType::All,
            non_key_attributes: Vec::new(),
        },
        provisioned_throughput: None,
    }
}

#[test]
fn test_should_query_gsi_in_reverse_order_with_limit() {
    let (db, clock) = emulator();
    create_movie_table(&db, vec![region_gsi()]);

    for i in 0..4 {
        put(
            &db,
            json!({
                "year": {"N": "2025"},
                "title": {"S": format!("Hello {i}")},
                "regionCode": {"S": "1"},
                "countryCode": {"S": format!("c{i}")}
            }),
        );
    }
    // Let the index staleness window pass.
    clock.advance(Duration::seconds(1));

    let result = db
        .query(QueryInput {
            table_name: "t".to_owned(),
            index_name: Some("regionGSI".to_owned()),
            key_condition_expression: Some("regionCode = :r".to_owned()),
            expression_attribute_values: attr_map(json!({":r": {"S": "1"}})),
            scan_index_forward: Some(false),
            limit: Some(2),
            ..QueryInput::default()
        })
        .expect("index query accepted");

    let countries: Vec<_> = result
        .entries
        .iter()
        .filter_map(|e| e.get("countryCode").and_then(AttributeValue::as_s))
        .collect();
    assert_eq!(countries, vec!["c3", "c2"]);
    // ALL projection carries the base attributes.
    assert!(result.entries[0].get("title").is_some());
}

#[test]
fn test_should_lag_gsi_reads_behind_base_writes() {
    let (db, clock) = emulator();
    create_movie_table(&db, vec![region_gsi()]);
    set_knobs(&db, "t", None, Some(5), None);

    put(
        &db,
        json!({
            "year": {"N": "2025"},
            "title": {"S": "Hello"},
            "regionCode": {"S": "1"},
            "countryCode": {"S": "c0"}
        }),
    );

    let query = |db: &Baddb| {
        db.query(QueryInput {
            table_name: "t".to_owned(),
            index_name: Some("regionGSI".to_owned()),
            key_condition_expression: Some("regionCode = :r".to_owned()),
            expression_attribute_values: attr_map(json!({":r": {"S": "1"}})),
            ..QueryInput::default()
        })
        .expect("index query accepted")
    };

    // Within the window the index does not see the write.
    assert!(query(&db).entries.is_empty());
    clock.advance(Duration::seconds(6));
    assert_eq!(query(&db).entries.len(), 1);
}

// ---------------------------------------------------------------------------
// S6 -- parallel scan partitioning
// ---------------------------------------------------------------------------

#[test]
fn test_should_partition_parallel_scan_without_overlap() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());

    for i in 0..10 {
        put(
            &db,
            json!({"year": {"N": format!("{}", 2000 + i)}, "title": {"S": format!("m{i}")}}),
        );
    }
    clock.advance(Duration::seconds(1));

    let scan_segment = |segment: Option<(i32, i32)>| {
        let result = db
            .scan(ScanInput {
                table_name: "t".to_owned(),
                total_segments: segment.map(|(total, _)| total),
                segment: segment.map(|(_, s)| s),
                ..ScanInput::default()
            })
            .expect("scan accepted");
        result
            .entries
            .iter()
            .map(|e| {
                e.get("title")
                    .and_then(AttributeValue::as_s)
                    .expect("title present")
                    .to_owned()
            })
            .collect::<Vec<_>>()
    };

    let mut combined = Vec::new();
    for segment in 0..3 {
        combined.extend(scan_segment(Some((3, segment))));
    }

    // No duplicates across segments, and the union equals the full scan.
    let mut deduped = combined.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), combined.len());

    let mut full = scan_segment(None);
    full.sort();
    assert_eq!(deduped, full);
    assert_eq!(full.len(), 10);
}

// ---------------------------------------------------------------------------
// S7 -- provisioned throughput exceeded
// ---------------------------------------------------------------------------

#[test]
fn test_should_reject_writes_after_burst_in_provisioned_mode() {
    let (db, _clock) = emulator();
    db.create_table(CreateTableInput {
        table_name: "t".to_owned(),
        key_schema: vec![
            key_schema_element("year", KeyType::Hash),
            key_schema_element("title", KeyType::Range),
        ],
        attribute_definitions: vec![
            attribute_definition("year", ScalarAttributeType::N),
            attribute_definition("title", ScalarAttributeType::S),
        ],
        billing_mode: Some(BillingMode::Provisioned),
        provisioned_throughput: Some(ProvisionedThroughput {
            read_capacity_units: 1,
            write_capacity_units: 1,
        }),
        ..CreateTableInput::default()
    })
    .expect("table created");

    let mut throttled = false;
    for i in 0..1000 {
        let result = db.put_item(PutItemInput {
            table_name: "t".to_owned(),
            item: attr_map(
                json!({"year": {"N": "2025"}, "title": {"S": format!("m{i}")}}),
            ),
            ..PutItemInput::default()
        });
        match result {
            Ok(_) => {}
            Err(BaddbError::ProvisionedThroughputExceeded { .. }) => {
                throttled = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(throttled, "expected throttling within 1000 attempts");
}

// ---------------------------------------------------------------------------
// S8 -- chaos counter
// ---------------------------------------------------------------------------

#[test]
fn test_should_fail_exactly_the_next_n_requests_after_chaos_injection() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());
    set_knobs(&db, "t", None, None, Some(3));

    for _ in 0..3 {
        let result = db.get_item(GetItemInput {
            table_name: "t".to_owned(),
            key: attr_map(movie_key()),
            consistent_read: Some(true),
            ..GetItemInput::default()
        });
        assert!(matches!(result, Err(BaddbError::Unprocessed)));
    }

    // The fourth request goes through (and finds nothing).
    let result = db
        .get_item(GetItemInput {
            table_name: "t".to_owned(),
            key: attr_map(movie_key()),
            consistent_read: Some(true),
            ..GetItemInput::default()
        })
        .expect("counter exhausted");
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Batch and transactional semantics
// ---------------------------------------------------------------------------

#[test]
fn test_should_collect_unprocessed_batch_writes_instead_of_failing() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());
    set_knobs(&db, "t", None, None, Some(1));

    let writes = (0..3)
        .map(|i| WriteRequest {
            put_request: Some(WirePutRequest {
                item: attr_map(
                    json!({"year": {"N": "2025"}, "title": {"S": format!("m{i}")}}),
                ),
            }),
            delete_request: None,
        })
        .collect::<Vec<_>>();

    let result = db
        .batch_write_item(BatchWriteItemInput {
            request_items: [("t".to_owned(), writes)].into_iter().collect(),
        })
        .expect("batch accepted");

    // Exactly one write hit the chaos counter; the others were applied.
    assert_eq!(result.unprocessed.get("t").map(Vec::len), Some(1));
    let scan = db
        .scan(ScanInput {
            table_name: "t".to_owned(),
            consistent_read: Some(true),
            ..ScanInput::default()
        })
        .expect("scan accepted");
    assert_eq!(scan.entries.len(), 2);
}

#[test]
fn test_should_roll_back_transaction_when_any_condition_fails() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());
    put(&db, json!({"year": {"N": "2025"}, "title": {"S": "existing"}}));

    let result = db.transact_write_items(TransactWriteItemsInput {
        transact_items: vec![
            TransactWriteItem {
                put: Some(TransactPut {
                    table_name: "t".to_owned(),
                    item: attr_map(json!({"year": {"N": "2025"}, "title": {"S": "fresh"}})),
                    ..TransactPut::default()
                }),
                ..TransactWriteItem::default()
            },
            TransactWriteItem {
                put: Some(TransactPut {
                    table_name: "t".to_owned(),
                    item: attr_map(
                        json!({"year": {"N": "2025"}, "title": {"S": "existing"}}),
                    ),
                    condition_expression: Some("attribute_not_exists(title)".to_owned()),
                    ..TransactPut::default()
                }),
                ..TransactWriteItem::default()
            },
        ],
    });
    assert!(matches!(result, Err(BaddbError::ConditionalCheckFailed)));

    // The first item's effect is not observable either.
    assert!(get(&db, json!({"year": {"N": "2025"}, "title": {"S": "fresh"}}), true).is_none());
}

#[test]
fn test_should_commit_transaction_when_all_conditions_pass() {
    let (db, _clock) = emulator();
    create_movie_table(&db, Vec::new());

    db.transact_write_items(TransactWriteItemsInput {
        transact_items: vec![
            TransactWriteItem {
                put: Some(TransactPut {
                    table_name: "t".to_owned(),
                    item: attr_map(json!({"year": {"N": "2025"}, "title": {"S": "a"}})),
                    ..TransactPut::default()
                }),
                ..TransactWriteItem::default()
            },
            TransactWriteItem {
                put: Some(TransactPut {
                    table_name: "t".to_owned(),
                    item: attr_map(json!({"year": {"N": "2025"}, "title": {"S": "b"}})),
                    ..TransactPut::default()
                }),
                ..TransactWriteItem::default()
            },
        ],
    })
    .expect("transaction commits");

    assert!(get(&db, json!({"year": {"N": "2025"}, "title": {"S": "a"}}), true).is_some());
    assert!(get(&db, json!({"year": {"N": "2025"}, "title": {"S": "b"}}), true).is_some());
}

// ---------------------------------------------------------------------------
// GSI projections and backfill
// ---------------------------------------------------------------------------

#[test]
fn test_should_project_keys_only_index_rows() {
    let (db, clock) = emulator();
    let mut gsi = region_gsi();
    gsi.projection = Projection {
        projection_type: ProjectionType::KeysOnly,
        non_key_attributes: Vec::new(),
    };
    create_movie_table(&db, vec![gsi]);

    put(
        &db,
        json!({
            "year": {"N": "2025"},
            "title": {"S": "Hello"},
            "regionCode": {"S": "1"},
            "countryCode": {"S": "c0"},
            "message": {"S": "hidden"}
        }),
    );
    clock.advance(Duration::seconds(1));

    let result = db
        .query(QueryInput {
            table_name: "t".to_owned(),
            index_name: Some("regionGSI".to_owned()),
            key_condition_expression: Some("regionCode = :r".to_owned()),
            expression_attribute_values: attr_map(json!({":r": {"S": "1"}})),
            ..QueryInput::default()
        })
        .expect("index query accepted");

    let entry = &result.entries[0];
    // Exactly the base-key and index-key attributes.
    assert_eq!(entry.len(), 4);
    assert!(entry.get("message").is_none());
    assert!(entry.get("year").is_some());
    assert!(entry.get("countryCode").is_some());
}

#[test]
fn test_should_backfill_index_added_to_existing_table() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());

    for i in 0..3 {
        put(
            &db,
            json!({
                "year": {"N": "2025"},
                "title": {"S": format!("Hello {i}")},
                "regionCode": {"S": "1"},
                "countryCode": {"S": format!("c{i}")}
            }),
        );
    }

    db.update_table(UpdateTableInput {
        table_name: "t".to_owned(),
        attribute_definitions: vec![
            attribute_definition("regionCode", ScalarAttributeType::S),
            attribute_definition("countryCode", ScalarAttributeType::S),
        ],
        global_secondary_index_updates: vec![GlobalSecondaryIndexUpdate {
            create: Some(CreateGlobalSecondaryIndexAction {
                index_name: "regionGSI".to_owned(),
                key_schema: vec![
                    key_schema_element("regionCode", KeyType::Hash),
                    key_schema_element("countryCode", KeyType::Range),
                ],
                projection: Projection {
                    projection_type: ProjectionType::All,
                    non_key_attributes: Vec::new(),
                },
                provisioned_throughput: None,
            }),
            delete: None,
        }],
    })
    .expect("index added");
    clock.advance(Duration::seconds(1));

    let result = db
        .query(QueryInput {
            table_name: "t".to_owned(),
            index_name: Some("regionGSI".to_owned()),
            key_condition_expression: Some("regionCode = :r".to_owned()),
            expression_attribute_values: attr_map(json!({":r": {"S": "1"}})),
            ..QueryInput::default()
        })
        .expect("index query accepted");
    assert_eq!(result.entries.len(), 3);
}

// ---------------------------------------------------------------------------
// Filters and pagination
// ---------------------------------------------------------------------------

#[test]
fn test_should_apply_filter_after_key_condition() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());

    for i in 0..4 {
        put(
            &db,
            json!({
                "year": {"N": "2025"},
                "title": {"S": format!("m{i}")},
                "views": {"N": format!("{}", i * 10)}
            }),
        );
    }
    clock.advance(Duration::seconds(1));

    let result = db
        .query(QueryInput {
            table_name: "t".to_owned(),
            key_condition_expression: Some("year = :y".to_owned()),
            filter_expression: Some("views > :min".to_owned()),
            expression_attribute_values: attr_map(
                json!({":y": {"N": "2025"}, ":min": {"N": "15"}}),
            ),
            ..QueryInput::default()
        })
        .expect("query accepted");

    // Four entries were examined, two survived the filter.
    assert_eq!(result.scanned_count, 4);
    assert_eq!(result.entries.len(), 2);
}

#[test]
fn test_should_paginate_query_with_exclusive_start_key() {
    let (db, clock) = emulator();
    create_movie_table(&db, Vec::new());

    for i in 0..5 {
        put(
            &db,
            json!({"year": {"N": "2025"}, "title": {"S": format!("m{i}")}}),
        );
    }
    clock.advance(Duration::seconds(1));

    let query = |start: HashMap<String, AttributeValue>| {
        db.query(QueryInput {
            table_name: "t".to_owned(),
            key_condition_expression: Some("year = :y".to_owned()),
            expression_attribute_values: attr_map(json!({":y": {"N": "2025"}})),
            limit: Some(2),
            exclusive_start_key: start,
            ..QueryInput::default()
        })
        .expect("query accepted")
    };

    let first = query(HashMap::new());
    assert_eq!(first.entries.len(), 2);

    // Resume strictly after the last returned key.
    let start = attr_map(json!({"year": {"N": "2025"}, "title": {"S": "m1"}}));
    let second = query(start);
    let titles: Vec<_> = second
        .entries
        .iter()
        .filter_map(|e| e.get("title").and_then(AttributeValue::as_s))
        .collect();
    assert_eq!(titles, vec!["m2", "m3"]);
}
