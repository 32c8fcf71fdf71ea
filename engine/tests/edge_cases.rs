//! Edge case tests for rowdelta-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use rowdelta_engine::{
    build_batch, can_insert, ensure_kind_exists, get_type, insert_child, insert_default_child,
    trim_empty, type_frequencies, valid_types, valid_types_with, DataKind, EditType, Error, Layout,
    OpType, Operation, RecordDelta, RecordSnapshot, Schema, Selector, Target, TypeSpec, Values,
    ValuesDelta,
};
use serde_json::{json, Value};

fn values(pairs: &[(&str, Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn email_kind() -> DataKind {
    DataKind::new("email")
        .with_typing(TypeSpec::new(
            "type",
            vec![EditType::new(1).with_specific_max(1), EditType::new(3)],
        ))
        .with_field("address")
}

fn note_kind() -> DataKind {
    DataKind::new("note").with_field("note")
}

fn test_schema() -> Schema {
    Schema::new("local")
        .with_kind(email_kind())
        .with_kind(note_kind())
}

fn stored_record(rows: Vec<Values>) -> RecordDelta {
    let mut snapshot = RecordSnapshot::new(values(&[("_id", json!(4))]));
    for row in rows {
        snapshot.add_row(row);
    }
    RecordDelta::from_snapshot(snapshot, Layout::default()).unwrap()
}

// ============================================================================
// Blank Value Edge Cases
// ============================================================================

#[test]
fn whitespace_and_control_characters_are_blank() {
    let kind = note_kind();
    for blank in ["", " ", "\t\n", "\u{0}", "\u{7}  "] {
        let row = ValuesDelta::from_after(values(&[("note", json!(blank))]));
        assert!(row.is_empty_for(&kind), "{blank:?} should be blank");
    }
}

#[test]
fn unicode_content_is_not_blank() {
    let kind = note_kind();
    for text in ["日本語", "Привет", "🎉", "\u{a0}x"] {
        let row = ValuesDelta::from_after(values(&[("note", json!(text))]));
        assert!(!row.is_empty_for(&kind), "{text:?} should have content");
    }
}

#[test]
fn non_string_values_count_as_content() {
    let kind = note_kind();
    for value in [json!(0), json!(false), json!([]), json!({})] {
        let row = ValuesDelta::from_after(values(&[("note", value)]));
        assert!(!row.is_empty_for(&kind));
    }
}

#[test]
fn kind_without_fields_is_always_empty() {
    let kind = DataKind::new("marker");
    let row = ValuesDelta::from_after(values(&[("anything", json!("set"))]));
    assert!(row.is_empty_for(&kind));
}

#[test]
fn null_and_missing_are_the_same() {
    let mut record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
        ("note", json!(null)),
    ])]);

    // clearing a column that was already null changes nothing
    record.entry_mut(10).unwrap().put_null("note");
    assert!(record.build_diff().unwrap().is_empty());

    record.entry_mut(10).unwrap().put_null("label");
    assert!(record.build_diff().unwrap().is_empty());
}

#[test]
fn cleared_column_is_sent_as_null() {
    let mut record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
        ("note", json!("hello")),
        ("label", json!("x")),
    ])]);
    record.entry_mut(10).unwrap().put_null("label");

    let ops = record.build_diff().unwrap();
    assert_eq!(ops[1].values().unwrap(), &values(&[("label", Value::Null)]));
}

#[test]
fn restoring_the_stored_value_cancels_the_edit() {
    let mut record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
        ("note", json!("hello")),
    ])]);
    let row = record.entry_mut(10).unwrap();
    row.put("note", "bye");
    row.put("note", "hello");

    assert!(!record.entry(10).unwrap().is_update());
    assert!(record.build_diff().unwrap().is_empty());
}

// ============================================================================
// Constraint Edge Cases
// ============================================================================

#[test]
fn untyped_kind_has_no_types_but_can_insert() {
    let kind = note_kind();
    let record = stored_record(Vec::new());
    assert!(valid_types(&record, &kind, None).is_empty());
    assert!(can_insert(&record, &kind));
}

#[test]
fn excluding_an_unused_type_changes_nothing() {
    let kind = email_kind();
    let record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("email")),
        ("type", json!(1)),
    ])]);
    let home = get_type(&kind, 1).unwrap();
    let other = get_type(&kind, 3).unwrap();

    let plain = valid_types(&record, &kind, None);
    let excluded = valid_types(&record, &kind, Some(other));
    assert_eq!(plain, excluded);
    assert_eq!(valid_types(&record, &kind, Some(home)).len(), 2);
}

#[test]
fn unknown_type_values_count_toward_the_total_only() {
    let kind = email_kind().with_typing(
        TypeSpec::new("type", vec![EditType::new(1), EditType::new(3)]).with_overall_max(2),
    );
    let record = stored_record(vec![
        values(&[("_id", json!(10)), ("mimetype", json!("email")), ("type", json!(99))]),
        values(&[("_id", json!(11)), ("mimetype", json!("email"))]),
    ]);

    let frequencies = type_frequencies(&record, &kind);
    assert_eq!(frequencies.total(), 2);
    assert_eq!(frequencies.count(99), 0);
    assert!(valid_types(&record, &kind, None).is_empty());
}

#[test]
fn rows_of_other_kinds_do_not_count() {
    let kind = email_kind();
    let mut record = stored_record(Vec::new());
    insert_child(&mut record, &note_kind(), None);
    insert_child(&mut record, &note_kind(), None);

    assert_eq!(type_frequencies(&record, &kind).total(), 0);
    assert_eq!(valid_types(&record, &kind, None).len(), 2);
}

#[test]
fn secondary_types_can_be_left_out() {
    let kind = DataKind::new("phone").with_typing(TypeSpec::new(
        "type",
        vec![EditType::new(1), EditType::new(4).with_secondary(true)],
    ));
    let record = stored_record(Vec::new());

    assert_eq!(valid_types_with(&record, &kind, None, true).len(), 2);
    let primary = valid_types_with(&record, &kind, None, false);
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].raw_value, 1);
}

#[test]
fn default_child_uses_defaults_and_best_type() {
    let kind = email_kind().with_default("label", "inbox");
    let mut record = stored_record(Vec::new());

    let row = insert_default_child(&mut record, &kind);
    assert_eq!(row.get_i64("type"), Some(1));
    assert_eq!(row.get_str("label"), Some("inbox"));
    assert_eq!(row.get_str("mimetype"), Some("email"));

    let row = insert_default_child(&mut record, &kind);
    assert_eq!(row.get_i64("type"), Some(3));
}

#[test]
fn ensure_kind_exists_adds_once() {
    let kind = note_kind();
    let mut record = stored_record(Vec::new());

    assert!(ensure_kind_exists(&mut record, &kind));
    assert!(!ensure_kind_exists(&mut record, &kind));
    assert_eq!(record.mime_entries_count("note", true), 1);
}

// ============================================================================
// Diff Edge Cases
// ============================================================================

#[test]
fn untouched_record_has_no_operations() {
    let record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
        ("note", json!("hello")),
    ])]);
    assert!(record.build_diff().unwrap().is_empty());
}

#[test]
fn deleted_record_emits_a_single_delete() {
    let mut record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
    ])]);
    record.entry_mut(10).unwrap().put("note", "edited");
    record.mark_deleted();

    let ops = record.build_diff().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op_type(), OpType::Delete);
    assert_eq!(ops[0].target(), Target::Record);
    assert_eq!(ops[0].selector(), Some(Selector::Id(4)));
}

#[test]
fn inserted_then_deleted_row_vanishes() {
    let mut record = stored_record(Vec::new());
    let id = insert_child(&mut record, &note_kind(), None)
        .id()
        .unwrap();
    record.entry_mut(id).unwrap().mark_deleted();

    assert!(record.entry(id).unwrap().is_transient());
    assert!(record.build_diff().unwrap().is_empty());
}

#[test]
fn new_record_with_stored_row_is_rejected() {
    let mut record = RecordDelta::fresh(Values::new(), Layout::default());
    record.add_entry(
        ValuesDelta::from_before(values(&[("_id", json!(10)), ("mimetype", json!("note"))]))
            .unwrap(),
    );

    let result = build_batch([&record]);
    assert!(matches!(result, Err(Error::PersistedRowOnNewRecord(10))));
}

#[test]
fn batch_keeps_record_order() {
    let mut first = stored_record(Vec::new());
    insert_child(&mut first, &note_kind(), None).put("note", "a");

    let mut snapshot = RecordSnapshot::new(values(&[("_id", json!(5))]));
    snapshot.add_row(values(&[("_id", json!(20)), ("mimetype", json!("note"))]));
    let mut second = RecordDelta::from_snapshot(snapshot, Layout::default()).unwrap();
    second.entry_mut(20).unwrap().mark_deleted();

    let ops = build_batch([&first, &second]).unwrap();
    let selectors: Vec<_> = ops.iter().filter_map(Operation::selector).collect();
    assert_eq!(
        selectors,
        vec![
            Selector::Id(4),
            Selector::Id(4),
            Selector::Id(5),
            Selector::Id(20),
            Selector::Id(5),
        ]
    );
}

#[test]
fn custom_layout_drives_every_column() {
    let layout = Layout {
        record_id_column: "contact_id".into(),
        row_id_column: "data_id".into(),
        mimetype_column: "kind".into(),
        aggregation_mode_column: "agg".into(),
        ..Layout::default()
    };
    let snapshot = RecordSnapshot::new(values(&[("contact_id", json!(8))])).with_row(values(&[
        ("data_id", json!(30)),
        ("kind", json!("note")),
        ("note", json!("hi")),
    ]));
    let mut record = RecordDelta::from_snapshot(snapshot, layout).unwrap();

    record.entry_mut(30).unwrap().put("note", "");
    trim_empty(&test_schema(), &mut record);
    let row = insert_child(&mut record, &note_kind(), None);
    row.put("note", "new");
    assert_eq!(row.get_str("kind"), Some("note"));

    let ops = record.build_diff().unwrap();
    assert_eq!(ops.len(), 4);
    assert!(ops[0].values().unwrap().contains_key("agg"));
    assert_eq!(ops[1].selector(), Some(Selector::Id(30)));
    assert!(!ops[2].values().unwrap().contains_key("data_id"));
}

// ============================================================================
// Trim Edge Cases
// ============================================================================

#[test]
fn trim_skips_undeclared_kinds() {
    let mut record = stored_record(Vec::new());
    record.add_entry(ValuesDelta::from_after(values(&[("mimetype", json!("im"))])));

    let summary = trim_empty(&test_schema(), &mut record);
    assert!(summary.is_noop());
    assert_eq!(record.entries().len(), 1);
}

#[test]
fn trim_leaves_explicit_deletes_alone() {
    let mut record = stored_record(vec![values(&[
        ("_id", json!(10)),
        ("mimetype", json!("note")),
    ])]);
    record.entry_mut(10).unwrap().mark_deleted();

    let summary = trim_empty(&test_schema(), &mut record);
    assert!(summary.is_noop());
    assert_eq!(record.build_diff().unwrap().len(), 3);
}

#[test]
fn trim_on_empty_record() {
    let mut record = stored_record(Vec::new());
    assert!(trim_empty(&test_schema(), &mut record).is_noop());
    assert!(trim_empty(&Schema::new("empty"), &mut record).is_noop());
}

// ============================================================================
// Configuration Edge Cases
// ============================================================================

#[test]
fn schema_from_json_rejects_duplicates() {
    let json = r#"{
        "source": "local",
        "kinds": [
            {"mimetype": "note", "fields": [{"column": "note"}]},
            {"mimetype": "note"}
        ]
    }"#;
    assert!(matches!(
        Schema::from_json(json),
        Err(Error::DuplicateKind(kind)) if kind == "note"
    ));
}

#[test]
fn schema_json_roundtrip() {
    let schema = test_schema();
    let json = schema.to_json().unwrap();
    let restored = Schema::from_json(&json).unwrap();
    assert_eq!(restored, schema);
}

#[test]
fn layout_from_json_partial() {
    let layout = Layout::from_json(r#"{"rowIdColumn": "data_id"}"#).unwrap();
    assert_eq!(layout.row_id_column, "data_id");
    assert_eq!(layout.record_id_column, "_id");
}

#[test]
fn snapshot_from_json_feeds_a_record() {
    let json = r#"{
        "values": {"_id": 4},
        "rows": [{"_id": 10, "mimetype": "note", "note": "hello"}]
    }"#;
    let snapshot = RecordSnapshot::from_json(json).unwrap();
    let record = RecordDelta::from_snapshot(snapshot, Layout::default()).unwrap();
    assert_eq!(record.entry(10).unwrap().get_str("note"), Some("hello"));
}

#[test]
fn non_integer_ids_are_rejected() {
    let snapshot = RecordSnapshot::new(values(&[("_id", json!("four"))]));
    assert!(matches!(
        RecordDelta::from_snapshot(snapshot, Layout::default()),
        Err(Error::MissingIdColumn(_))
    ));
}
