//! PgWarehouse against a live database.
//!
//! Run with:
//! ```sh
//! DATABASE_URL="postgresql:///warehouse_test" \
//!   cargo test -p warehouse-postgres -- --ignored --nocapture
//! ```

use rust_decimal::Decimal;

use warehouse_core::{
    ColumnType, LoadOutcome, Materialization, MergeEngine, OnSchemaChange, Relation, Schema,
    Value, Warehouse, WatermarkClass, WatermarkConfig,
};
use warehouse_postgres::PgWarehouse;

async fn warehouse(schema: &str) -> anyhow::Result<PgWarehouse> {
    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql:///warehouse_test".into());
    let wh = PgWarehouse::connect(&url, schema).await?;
    for t in wh.list_tables().await? {
        sqlx::query(&format!("DROP TABLE \"{schema}\".\"{t}\""))
            .execute(wh.pool())
            .await?;
    }
    Ok(wh)
}

fn ceaps(rows: &[(i64, &str)]) -> Relation {
    let schema = Schema::from_pairs(&[("id", ColumnType::Integer), ("valor", ColumnType::Decimal)]);
    Relation::with_rows(
        "fct_ceaps",
        schema,
        rows.iter()
            .map(|(id, v)| vec![Value::Int(*id), Value::Decimal(v.parse::<Decimal>().unwrap())])
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn rebuild_then_merge_roundtrip() -> anyhow::Result<()> {
    let wh = warehouse("wh_it_merge").await?;
    let engine = MergeEngine::new(&wh);
    let cfg = Materialization::incremental(
        &["id"],
        WatermarkConfig::new(WatermarkClass::AutoIncrementId, "id"),
        OnSchemaChange::SyncAllColumns,
    );

    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(&[(1, "10.50"), (2, "20")]))
        .await?;
    assert_eq!(wh.max_value("fct_ceaps", "id").await?, Value::Int(2));

    let out = engine
        .materialize(
            "fct_ceaps",
            &cfg,
            false,
            ceaps(&[(1, "10.50"), (2, "20"), (3, "30")]),
        )
        .await?;
    let LoadOutcome::Merged { stats, .. } = out else {
        panic!("expected a merge");
    };
    assert_eq!((stats.inserted, stats.updated, stats.total), (1, 0, 3));

    let stored = wh.read_table("fct_ceaps").await?;
    assert_eq!(stored.len(), 3);
    assert_eq!(stored.schema().column("valor").map(|c| c.ty), Some(ColumnType::Decimal));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn added_column_is_null_for_existing_rows() -> anyhow::Result<()> {
    let wh = warehouse("wh_it_schema").await?;
    let engine = MergeEngine::new(&wh);
    let cfg = Materialization::incremental(
        &["id"],
        WatermarkConfig::new(WatermarkClass::AutoIncrementId, "id"),
        OnSchemaChange::AppendNewColumns,
    );
    engine
        .materialize("fct_ceaps", &cfg, false, ceaps(&[(1, "1")]))
        .await?;

    let wider = Relation::with_rows(
        "fct_ceaps",
        Schema::from_pairs(&[
            ("id", ColumnType::Integer),
            ("valor", ColumnType::Decimal),
            ("fornecedor", ColumnType::Text),
        ]),
        vec![vec![Value::Int(2), Value::Decimal(Decimal::ONE), "ACME".into()]],
    )?;
    engine.materialize("fct_ceaps", &cfg, false, wider).await?;

    let stored = wh.read_table("fct_ceaps").await?;
    let f = stored.col("fornecedor")?;
    let id = stored.col("id")?;
    for row in stored.rows() {
        match row[id] {
            Value::Int(1) => assert_eq!(row[f], Value::Null),
            _ => assert_eq!(row[f], Value::Text("ACME".into())),
        }
    }
    Ok(())
}
