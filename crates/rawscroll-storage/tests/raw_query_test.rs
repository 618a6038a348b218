//! Raw query access and projection against SQLite.

use rawscroll_core::config::{DatabaseConfig, RawScrollConfig};
use rawscroll_core::errors::QueryError;
use rawscroll_core::types::SqlValue;
use rawscroll_storage::{
    ConnectionHandler, Connections, CursorState, FieldKind, PageCountMode, RawQuery, RawQuerySet,
    RowCount, RowSlice, Schema,
};

/// A file-backed database with `t(id, name)` holding `rows` rows.
struct Fixture {
    _dir: tempfile::TempDir,
    handler: ConnectionHandler,
}

impl Fixture {
    fn new(rows: i64, server_side: bool) -> Self {
        Self::with_paging(rows, server_side, None)
    }

    fn with_paging(rows: i64, server_side: bool, paging: Option<(usize, u64)>) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, email TEXT, score REAL);",
        )
        .unwrap();
        let letters: Vec<char> = ('a'..='z').collect();
        for i in 1..=rows {
            let name = letters[((i - 1) % 26) as usize].to_string();
            conn.execute(
                "INSERT INTO t (id, name, email, score) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![i, name, format!("{name}@example.com"), i as f64 / 2.0],
            )
            .unwrap();
        }
        drop(conn);

        let mut config = RawScrollConfig::default().with_database(
            "default",
            DatabaseConfig::new("sqlite", path.to_string_lossy()),
        );
        config.use_server_side_cursors = Some(server_side);
        config.query_log.enabled = Some(true);
        if let Some((rows_per_page, max_pages)) = paging {
            config.paging.rows_per_page = Some(rows_per_page);
            config.paging.max_pages = Some(max_pages);
        }
        Self {
            _dir: dir,
            handler: ConnectionHandler::with_builtin(config),
        }
    }

    fn scope(&self) -> Connections {
        self.handler.scope()
    }
}

fn ids(records: &[rawscroll_storage::Record]) -> Vec<i64> {
    records.iter().filter_map(|r| r.pk().as_i64()).collect()
}

#[test]
fn three_row_scenario() {
    for server_side in [false, true] {
        let fixture = Fixture::new(3, server_side);
        let connections = fixture.scope();
        let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id, name FROM t"));

        assert_eq!(qs.columns().unwrap(), vec!["id", "name"]);

        let first_two = qs.slice(RowSlice::range(0, 2)).unwrap();
        assert_eq!(first_two.len(), 2);
        for (record, (id, name)) in first_two.iter().zip([(1, "a"), (2, "b")]) {
            assert_eq!(record.get("id").unwrap(), &SqlValue::Integer(id));
            assert_eq!(record.get("name").unwrap(), &SqlValue::Text(name.into()));
            assert!(record.deferred_fields().is_empty());
            assert_eq!(record.db(), "default");
        }

        let third = qs.get(2).unwrap().unwrap();
        assert_eq!(third.get("name").unwrap(), &SqlValue::Text("c".into()));

        assert_eq!(qs.count().unwrap(), RowCount::Exact(3));
        assert_eq!(qs.count().unwrap().as_u64(), Some(3));
    }
}

#[test]
fn alternating_access_never_drifts() {
    for server_side in [false, true] {
        let fixture = Fixture::new(10, server_side);
        let connections = fixture.scope();
        let mut query = RawQuery::new(&connections, "SELECT id FROM t ORDER BY id");
        let five = query.get(5).unwrap();
        let two = query.get(2).unwrap();
        assert_eq!(query.get(5).unwrap(), five);
        assert_eq!(query.get(2).unwrap(), two);
        assert_eq!(five.unwrap()[0], SqlValue::Integer(6));
        assert_eq!(query.state(), CursorState::Open { offset: 0 });
    }
}

#[test]
fn reads_ignore_writes_from_other_connections() {
    for server_side in [false, true] {
        let fixture = Fixture::new(3, server_side);
        let path = fixture._dir.path().join("app.db");
        let writer = rusqlite::Connection::open(&path).unwrap();
        let mode: String = writer
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let connections = fixture.scope();
        let mut query = RawQuery::new(&connections, "SELECT id, name FROM t ORDER BY id");
        let first = query.get(0).unwrap();
        writer
            .execute("INSERT INTO t (id, name) VALUES (0, 'z')", [])
            .unwrap();

        assert_eq!(query.get(0).unwrap(), first);
        assert_eq!(query.slice(..).unwrap().len(), 3);
        if server_side {
            // The count runs on the same connection, inside the snapshot.
            assert_eq!(query.count_rows().unwrap(), 3);
        }

        query.close().unwrap();
        let mut fresh = RawQuery::new(&connections, "SELECT id, name FROM t ORDER BY id");
        assert_eq!(fresh.get(0).unwrap().unwrap()[0], SqlValue::Integer(0));
    }
}

#[test]
fn pragma_columns_resolve() {
    for server_side in [false, true] {
        let fixture = Fixture::new(1, server_side);
        let connections = fixture.scope();
        let mut query = RawQuery::new(&connections, "PRAGMA table_info(t)");
        assert_eq!(
            query.columns().unwrap(),
            ["cid", "name", "type", "notnull", "dflt_value", "pk"]
        );
        assert_eq!(query.slice(..).unwrap().len(), 4);
    }
}

#[test]
fn index_and_single_row_slice_agree() {
    let fixture = Fixture::new(8, true);
    let connections = fixture.scope();
    let mut query = RawQuery::new(&connections, "SELECT id, name FROM t ORDER BY id");
    for k in 0..10 {
        let by_index = query.get(k).unwrap();
        let by_slice = query.slice(RowSlice::range(k, k + 1)).unwrap();
        assert_eq!(by_index, by_slice.into_iter().next());
        assert_eq!(query.get(0).unwrap().unwrap()[0], SqlValue::Integer(1));
    }
}

#[test]
fn negative_access_is_rejected() {
    let fixture = Fixture::new(3, false);
    let connections = fixture.scope();
    let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id FROM t"));
    assert!(matches!(qs.get(-3), Err(QueryError::UnsupportedIndex { .. })));
    assert!(matches!(
        qs.slice(RowSlice::range(-1, 5)),
        Err(QueryError::UnsupportedIndex { .. })
    ));
    assert_eq!(qs.query().state(), CursorState::Unopened);
}

#[test]
fn only_exact_counting_touches_the_database() {
    let fixture = Fixture::new(5, true);
    let connections = fixture.scope();
    let handle = connections.get("default").unwrap();

    for mode in [PageCountMode::All, PageCountMode::NoCount] {
        handle.reset_queries();
        let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id FROM t"))
            .with_count_mode(mode);
        let count = qs.count().unwrap();
        match mode {
            PageCountMode::All => assert_eq!(count, RowCount::Unbounded),
            _ => assert_eq!(count, RowCount::Capped(249_975)),
        }
        assert!(handle.queries().is_empty(), "{mode:?} issued SQL");
        assert_eq!(qs.query().state(), CursorState::Unopened);
    }

    handle.reset_queries();
    let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id FROM t"));
    assert_eq!(qs.count().unwrap(), RowCount::Exact(5));
    let logged: Vec<String> = handle.queries().into_iter().map(|q| q.sql).collect();
    assert!(logged
        .iter()
        .any(|sql| sql.contains("count(*) FROM (SELECT id FROM t) AS prq1")));

    // Cached: no further SQL.
    handle.reset_queries();
    assert_eq!(qs.count().unwrap(), RowCount::Exact(5));
    assert!(handle.queries().is_empty());
}

#[test]
fn exact_count_is_capped_at_the_extent() {
    for server_side in [false, true] {
        // 4 rows per page * 3 pages = extent 12.
        let at_cap = Fixture::with_paging(12, server_side, Some((4, 3)));
        let connections = at_cap.scope();
        let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id FROM t"));
        assert_eq!(qs.count().unwrap().as_u64(), Some(12));

        let beyond = Fixture::with_paging(40, server_side, Some((4, 3)));
        let connections = beyond.scope();
        let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id FROM t"));
        assert_eq!(qs.count().unwrap(), RowCount::Capped(12));
        assert_eq!(qs.query().position(), Some(0));

        // Open-ended slices stop at the extent too.
        assert_eq!(qs.slice(RowSlice::from_start(5)).unwrap().len(), 7);
    }
}

#[test]
fn count_binds_query_params() {
    let fixture = Fixture::new(10, false);
    let connections = fixture.scope();
    let query = RawQuery::new(&connections, "SELECT id FROM t WHERE id <= ?")
        .with_params([SqlValue::Integer(4)]);
    let mut qs = RawQuerySet::new(query);
    assert_eq!(qs.count().unwrap(), RowCount::Exact(4));
}

#[test]
fn missing_primary_key_is_invalid() {
    let fixture = Fixture::new(3, true);
    let connections = fixture.scope();
    let schema = Schema::builder("person")
        .field("id", FieldKind::Integer)
        .field("name", FieldKind::Text)
        .build()
        .unwrap();
    let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT name FROM t"))
        .with_schema(schema);
    match qs.get(0) {
        Err(QueryError::InvalidQuery { alias, sql, .. }) => {
            assert_eq!(alias, "default");
            assert_eq!(sql, "SELECT name FROM t");
        }
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
    assert!(matches!(
        qs.slice(RowSlice::all()),
        Err(QueryError::InvalidQuery { .. })
    ));
}

#[test]
fn absent_fields_are_deferred_and_extras_annotated() {
    let fixture = Fixture::new(3, false);
    let connections = fixture.scope();
    let schema = Schema::builder("person")
        .field("id", FieldKind::Integer)
        .field("name", FieldKind::Text)
        .field("email", FieldKind::Text)
        .build()
        .unwrap();
    let mut qs = RawQuerySet::new(RawQuery::new(
        &connections,
        "SELECT id, name, score * 2 AS doubled FROM t ORDER BY id",
    ))
    .with_schema(schema);

    let record = qs.get(1).unwrap().unwrap();
    assert_eq!(record.schema_name(), "person");
    assert_eq!(record.deferred_fields(), ["email".to_string()]);
    assert!(matches!(
        record.get("email"),
        Err(QueryError::DeferredField { field }) if field == "email"
    ));
    assert_eq!(record.annotation("doubled"), Some(&SqlValue::Real(2.0)));
    assert_eq!(record.get("doubled").unwrap(), &SqlValue::Real(2.0));
    assert!(matches!(
        record.get("nickname"),
        Err(QueryError::UnknownField { .. })
    ));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "id": 2, "name": "b", "doubled": 2.0 })
    );
}

#[test]
fn translations_rename_columns() {
    let fixture = Fixture::new(2, true);
    let connections = fixture.scope();
    let schema = Schema::builder("person")
        .field("id", FieldKind::Integer)
        .column_field("label", "label_col", FieldKind::Text)
        .build()
        .unwrap();
    let mut qs = RawQuerySet::new(RawQuery::new(
        &connections,
        "SELECT id AS pk, name FROM t ORDER BY id",
    ))
    .with_schema(schema)
    .with_translations([("pk", "id"), ("name", "label_col")]);

    assert_eq!(qs.columns().unwrap(), vec!["id", "label_col"]);
    let records = qs.slice(..).unwrap();
    assert_eq!(ids(&records), vec![1, 2]);
    assert_eq!(records[1].get("label").unwrap(), &SqlValue::Text("b".into()));
}

#[test]
fn field_kinds_coerce_values() {
    let fixture = Fixture::new(2, false);
    let connections = fixture.scope();
    let schema = Schema::builder("scored")
        .field("id", FieldKind::Text)
        .field("score", FieldKind::Real)
        .build()
        .unwrap();
    let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT id, score FROM t ORDER BY id"))
        .with_schema(schema);
    let record = qs.get(0).unwrap().unwrap();
    assert_eq!(record.pk(), &SqlValue::Text("1".into()));
    assert_eq!(record.get("score").unwrap(), &SqlValue::Real(0.5));
}

#[test]
fn inferred_schema_uses_first_column_without_id() {
    let fixture = Fixture::new(2, true);
    let connections = fixture.scope();
    let mut qs = RawQuerySet::new(RawQuery::new(
        &connections,
        "SELECT email, name FROM t ORDER BY id",
    ));
    assert_eq!(qs.schema().unwrap().primary_key(), "email");
    let record = qs.get(0).unwrap().unwrap();
    assert_eq!(record.pk(), &SqlValue::Text("a@example.com".into()));
}

#[test]
fn other_alias_is_used_when_named() {
    let fixture = Fixture::new(2, false);
    let mut config = fixture.handler.config().clone();
    config.databases.insert("scratch".into(), DatabaseConfig::new("sqlite", ":memory:"));
    let handler = ConnectionHandler::with_builtin(config);
    let connections = handler.scope();

    let mut qs = RawQuerySet::new(RawQuery::new(&connections, "SELECT 7 AS id").using("scratch"));
    let record = qs.get(0).unwrap().unwrap();
    assert_eq!(record.db(), "scratch");
    assert_eq!(record.pk(), &SqlValue::Integer(7));
    assert!(connections.contains("scratch"));
    assert!(!connections.contains("default"));
}

#[test]
fn dummy_engine_refuses_queries() {
    let config = RawScrollConfig::default().with_database("default", DatabaseConfig::default());
    let handler = ConnectionHandler::with_builtin(config);
    let connections = handler.scope();
    let mut query = RawQuery::new(&connections, "SELECT 1");
    assert!(matches!(query.get(0), Err(QueryError::Storage(_))));
    assert!(matches!(
        query.columns(),
        Err(QueryError::ColumnResolution { .. })
    ));
}
