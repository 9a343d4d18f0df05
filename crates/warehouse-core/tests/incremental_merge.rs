//! Incremental merge behaviour against the in-memory warehouse.
//!
//! Covers the load lifecycle end to end: first build, watermark-bounded
//! merges for each watermark class, schema reconciliation, and rejection of
//! bad batches without touching the target.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use warehouse_core::{
    ColumnType, LoadOutcome, LoadPlan, Materialization, MemoryWarehouse, MergeEngine,
    OnSchemaChange, Relation, Schema, Value, Warehouse, WarehouseError, WatermarkClass,
    WatermarkConfig,
};

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn d(s: &str) -> Value {
    Value::Decimal(s.parse::<Decimal>().unwrap())
}

fn date(y: i32, m: u32, day: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
}

fn ceaps_config() -> Materialization {
    Materialization::incremental(
        &["id"],
        WatermarkConfig::new(WatermarkClass::AutoIncrementId, "id"),
        OnSchemaChange::SyncAllColumns,
    )
}

fn ceaps(rows: Vec<(i64, &str)>) -> Relation {
    let schema = Schema::from_pairs(&[("id", ColumnType::Integer), ("valor", ColumnType::Decimal)]);
    Relation::with_rows(
        "fct_ceaps",
        schema,
        rows.into_iter().map(|(id, v)| vec![id.into(), d(v)]).collect(),
    )
    .unwrap()
}

fn emendas_config() -> Materialization {
    Materialization::incremental(
        &["codigo_emenda"],
        WatermarkConfig::new(WatermarkClass::YearBucket, "ano_emenda"),
        OnSchemaChange::SyncAllColumns,
    )
}

fn emendas(rows: Vec<(&str, i64, &str)>) -> Relation {
    let schema = Schema::from_pairs(&[
        ("codigo_emenda", ColumnType::Text),
        ("ano_emenda", ColumnType::Integer),
        ("valor_pago", ColumnType::Decimal),
    ]);
    Relation::with_rows(
        "fct_emenda_documento",
        schema,
        rows.into_iter()
            .map(|(c, y, v)| vec![c.into(), y.into(), d(v)])
            .collect(),
    )
    .unwrap()
}

async fn row_for(wh: &MemoryWarehouse, table: &str, key_col: &str, key: Value) -> Vec<Value> {
    let rel = wh.read_table(table).await.unwrap();
    let i = rel.col(key_col).unwrap();
    rel.rows()
        .iter()
        .find(|r| r[i] == key)
        .cloned()
        .unwrap_or_else(|| panic!("no row with {key_col} = {key}"))
}

// ── First build ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_build_is_full_and_exact() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();

    let plan = engine.plan("fct_ceaps", &cfg, false).await.unwrap();
    assert_eq!(plan, LoadPlan::FullBuild);

    let out = engine
        .execute("fct_ceaps", &cfg, plan, ceaps(vec![(1, "10"), (2, "20")]))
        .await
        .unwrap();
    assert_eq!(out, LoadOutcome::Rebuilt { rows: 2 });
    assert_eq!(wh.read_table("fct_ceaps").await.unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_key_in_full_build_leaves_target_untouched() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(vec![(1, "10")]))
        .await
        .unwrap();

    let err = engine
        .materialize("fct_ceaps", &cfg, true, ceaps(vec![(5, "1"), (5, "2")]))
        .await
        .unwrap_err();
    assert!(matches!(err, WarehouseError::DuplicateBusinessKey { .. }));

    let rel = wh.read_table("fct_ceaps").await.unwrap();
    assert_eq!(rel.len(), 1);
    assert_eq!(rel.rows()[0][0], Value::Int(1));
}

// ── Incremental merges ───────────────────────────────────────────────────────

#[tokio::test]
async fn auto_increment_merge_adds_only_new_ids() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(vec![(1, "10"), (2, "20")]))
        .await
        .unwrap();

    // id 2 changed in the source but sits at the watermark: strict `>` skips it.
    let out = engine
        .materialize(
            "fct_ceaps",
            &cfg,
            false,
            ceaps(vec![(1, "10"), (2, "99"), (3, "30")]),
        )
        .await
        .unwrap();

    let LoadOutcome::Merged {
        candidates, stats, ..
    } = out
    else {
        panic!("expected a merge, got {out:?}");
    };
    assert_eq!(candidates, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.total, 3);
    assert_eq!(
        row_for(&wh, "fct_ceaps", "id", Value::Int(2)).await[1],
        d("20")
    );
}

#[tokio::test]
async fn year_bucket_reprocesses_boundary_year() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = emendas_config();
    engine
        .materialize(
            "fct_emenda_documento",
            &cfg,
            false,
            emendas(vec![("202212340001", 2022, "5"), ("202312340001", 2023, "100")]),
        )
        .await
        .unwrap();

    let plan = engine
        .plan("fct_emenda_documento", &cfg, false)
        .await
        .unwrap();
    let LoadPlan::Incremental(pred) = &plan else {
        panic!("expected incremental plan");
    };
    assert_eq!(pred.to_string(), "ano_emenda >= 2023");

    let out = engine
        .execute(
            "fct_emenda_documento",
            &cfg,
            plan,
            emendas(vec![
                ("202212340001", 2022, "7"),
                ("202312340001", 2023, "150"),
                ("202412340001", 2024, "50"),
            ]),
        )
        .await
        .unwrap();

    let LoadOutcome::Merged { stats, .. } = out else {
        panic!("expected a merge");
    };
    assert_eq!((stats.inserted, stats.updated, stats.total), (1, 1, 3));
    let corrected = row_for(
        &wh,
        "fct_emenda_documento",
        "codigo_emenda",
        "202312340001".into(),
    )
    .await;
    assert_eq!(corrected[2], d("150"));
    // 2022 lies below the bucket and keeps its stored value.
    let old = row_for(
        &wh,
        "fct_emenda_documento",
        "codigo_emenda",
        "202212340001".into(),
    )
    .await;
    assert_eq!(old[2], d("5"));
}

#[tokio::test]
async fn event_date_on_empty_target_uses_sentinel() {
    let wh = MemoryWarehouse::new();
    let schema = Schema::from_pairs(&[
        ("codigo_sessao_votacao", ColumnType::Integer),
        ("codigo_parlamentar", ColumnType::Integer),
        ("data_sessao", ColumnType::Date),
    ]);
    wh.insert_table(Relation::new("fct_votacao", schema.clone()))
        .await;
    let cfg = Materialization::incremental(
        &["codigo_sessao_votacao", "codigo_parlamentar"],
        WatermarkConfig::new(WatermarkClass::EventDate, "data_sessao"),
        OnSchemaChange::SyncAllColumns,
    );
    let engine = MergeEngine::new(&wh);

    let plan = engine.plan("fct_votacao", &cfg, false).await.unwrap();
    assert_eq!(
        plan,
        LoadPlan::Incremental(warehouse_core::WatermarkPredicate {
            column: "data_sessao".into(),
            comparator: warehouse_core::Comparator::Gt,
            value: date(1900, 1, 1),
        })
    );

    let built = Relation::with_rows(
        "fct_votacao",
        schema,
        vec![
            vec![10.into(), 1.into(), date(2024, 3, 5)],
            vec![10.into(), 2.into(), date(2024, 3, 5)],
            vec![11.into(), 1.into(), Value::Null],
        ],
    )
    .unwrap();
    let out = engine.execute("fct_votacao", &cfg, plan, built).await.unwrap();
    let LoadOutcome::Merged { stats, .. } = out else {
        panic!("expected a merge");
    };
    // A null watermark value never satisfies the predicate.
    assert_eq!(stats.total, 2);
}

#[tokio::test]
async fn rerun_with_unchanged_input_is_a_no_op() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();
    let input = ceaps(vec![(1, "10"), (2, "20")]);
    engine
        .materialize("fct_ceaps", &cfg, false, input.clone())
        .await
        .unwrap();
    let before = wh.read_table("fct_ceaps").await.unwrap();

    let out = engine
        .materialize("fct_ceaps", &cfg, false, input)
        .await
        .unwrap();
    let LoadOutcome::Merged { candidates, .. } = out else {
        panic!("expected a merge");
    };
    assert_eq!(candidates, 0);
    assert_eq!(wh.read_table("fct_ceaps").await.unwrap(), before);
}

// ── Schema reconciliation ────────────────────────────────────────────────────

#[tokio::test]
async fn new_column_is_added_and_old_rows_are_null_filled() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(vec![(1, "10")]))
        .await
        .unwrap();

    let schema = Schema::from_pairs(&[
        ("id", ColumnType::Integer),
        ("valor", ColumnType::Decimal),
        ("fornecedor", ColumnType::Text),
    ]);
    let wider = Relation::with_rows(
        "fct_ceaps",
        schema,
        vec![
            vec![1.into(), d("10"), "ACME".into()],
            vec![2.into(), d("20"), "ACME".into()],
        ],
    )
    .unwrap();
    let out = engine
        .materialize("fct_ceaps", &cfg, false, wider)
        .await
        .unwrap();
    let LoadOutcome::Merged { schema_changes, .. } = out else {
        panic!("expected a merge");
    };
    assert_eq!(schema_changes.len(), 1);

    let stored = wh.read_table("fct_ceaps").await.unwrap();
    assert!(stored.schema().contains("fornecedor"));
    assert_eq!(row_for(&wh, "fct_ceaps", "id", Value::Int(1)).await[2], Value::Null);
    assert_eq!(
        row_for(&wh, "fct_ceaps", "id", Value::Int(2)).await[2],
        Value::Text("ACME".into())
    );
}

#[tokio::test]
async fn fail_policy_rejects_shape_change() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = Materialization::incremental(
        &["id"],
        WatermarkConfig::new(WatermarkClass::AutoIncrementId, "id"),
        OnSchemaChange::Fail,
    );
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(vec![(1, "10")]))
        .await
        .unwrap();

    let narrow = Relation::with_rows(
        "fct_ceaps",
        Schema::from_pairs(&[("id", ColumnType::Integer)]),
        vec![vec![2.into()]],
    )
    .unwrap();
    let err = engine
        .materialize("fct_ceaps", &cfg, false, narrow)
        .await
        .unwrap_err();
    assert!(matches!(err, WarehouseError::SchemaChangeRejected { .. }));
    assert_eq!(wh.read_table("fct_ceaps").await.unwrap().len(), 1);
}

#[tokio::test]
async fn incompatible_retype_is_an_error() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = ceaps_config();
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(vec![(1, "10")]))
        .await
        .unwrap();

    let retyped = Relation::with_rows(
        "fct_ceaps",
        Schema::from_pairs(&[("id", ColumnType::Integer), ("valor", ColumnType::Date)]),
        vec![vec![2.into(), date(2024, 1, 1)]],
    )
    .unwrap();
    let err = engine
        .materialize("fct_ceaps", &cfg, false, retyped)
        .await
        .unwrap_err();
    assert!(matches!(err, WarehouseError::IncompatibleTypeChange { .. }));
}

#[tokio::test]
async fn widened_watermark_column_keeps_merging() {
    let wh = MemoryWarehouse::new();
    let engine = MergeEngine::new(&wh);
    let cfg = emendas_config();
    engine
        .materialize("fct_emenda_documento", &cfg, false, emendas(vec![("E1", 2023, "1")]))
        .await
        .unwrap();

    // a source revision ships the year as a decimal; reconciliation widens it
    let decimal_year = Relation::with_rows(
        "fct_emenda_documento",
        Schema::from_pairs(&[
            ("codigo_emenda", ColumnType::Text),
            ("ano_emenda", ColumnType::Decimal),
            ("valor_pago", ColumnType::Decimal),
        ]),
        vec![vec!["E2".into(), d("2024"), d("2")]],
    )
    .unwrap();
    engine
        .materialize("fct_emenda_documento", &cfg, false, decimal_year)
        .await
        .unwrap();
    let stored = wh.read_table("fct_emenda_documento").await.unwrap();
    assert_eq!(
        stored.schema().column("ano_emenda").unwrap().ty,
        ColumnType::Decimal
    );

    let plan = engine.plan("fct_emenda_documento", &cfg, false).await.unwrap();
    let LoadPlan::Incremental(predicate) = &plan else {
        panic!("expected an incremental plan, got {plan:?}");
    };
    assert_eq!(predicate.value, d("2024"));

    let out = engine
        .execute(
            "fct_emenda_documento",
            &cfg,
            plan,
            emendas(vec![("E1", 2023, "9"), ("E2", 2024, "3"), ("E3", 2025, "4")]),
        )
        .await
        .unwrap();
    let LoadOutcome::Merged { stats, .. } = out else {
        panic!("expected a merge");
    };
    assert_eq!((stats.inserted, stats.updated, stats.total), (1, 1, 3));
    assert_eq!(
        row_for(&wh, "fct_emenda_documento", "codigo_emenda", "E1".into()).await[2],
        d("1")
    );
}

#[tokio::test]
async fn watermark_column_of_wrong_type_is_rejected() {
    let wh = MemoryWarehouse::new();
    wh.insert_table(Relation::new(
        "fct_votacao",
        Schema::from_pairs(&[("k", ColumnType::Integer), ("data_sessao", ColumnType::Text)]),
    ))
    .await;
    let cfg = Materialization::incremental(
        &["k"],
        WatermarkConfig::new(WatermarkClass::EventDate, "data_sessao"),
        OnSchemaChange::SyncAllColumns,
    );
    let err = MergeEngine::new(&wh)
        .plan("fct_votacao", &cfg, false)
        .await
        .unwrap_err();
    assert!(matches!(err, WarehouseError::InvalidConfig(_)));
}
