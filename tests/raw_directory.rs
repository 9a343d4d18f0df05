//! Raw directory fixtures: extracts on disk feeding the staging stages.
//!
//! Run with: cargo test --test raw_directory

use std::fs;
use std::path::Path;

use congresso_warehouse::raw::{DirectorySource, RawSource};
use congresso_warehouse::{Pipeline, RunOptions, StepOutcome, WarehouseConfig};
use warehouse_core::{MemoryWarehouse, Value, Warehouse};

fn write_jsonl(dir: &Path, source: &str, lines: &[&str]) {
    fs::write(dir.join(format!("{source}.jsonl")), lines.join("\n")).unwrap();
}

#[test]
fn missing_extract_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let raw = DirectorySource::new(dir.path());
    assert!(raw.load("ceaps").unwrap().is_none());
}

#[test]
fn jsonl_extract_is_read() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        "senadores",
        &[
            r#"{"senador_id": "5012", "nome_parlamentar": "Fulano de Tal"}"#,
            "",
            r#"{"senador_id": "5013", "nome_parlamentar": "Beltrana"}"#,
        ],
    );
    let records = DirectorySource::new(dir.path())
        .load("senadores")
        .unwrap()
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["nome_parlamentar"], "Beltrana");
}

#[tokio::test]
async fn pipeline_stages_what_is_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_jsonl(
        dir.path(),
        "senadores",
        &[r#"{"senador_id": "5012", "nome_parlamentar": "Fulano de Tal"}"#],
    );
    write_jsonl(
        dir.path(),
        "ceaps",
        &[
            r#"{"id": 10, "cod_senador": 5012, "ano": 2024, "mes": 2, "valor_reembolsado": "2.500,75"}"#,
            r#"{"id": 11, "cod_senador": 5012, "ano": 2024, "mes": 2, "valor_reembolsado": "não informado"}"#,
        ],
    );

    let warehouse = MemoryWarehouse::new();
    let config = WarehouseConfig {
        raw_dir: dir.path().to_path_buf(),
        ..WarehouseConfig::default()
    };
    let report = Pipeline::standard()
        .unwrap()
        .run(
            &warehouse,
            &DirectorySource::new(&config.raw_dir),
            &config,
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.outcome("stg_ceaps"), Some(&StepOutcome::Built { rows: 2 }));
    assert_eq!(report.outcome("fct_ceaps"), Some(&StepOutcome::Built { rows: 2 }));
    assert!(matches!(
        report.outcome("stg_servidores"),
        Some(StepOutcome::Skipped { .. })
    ));

    let fct = warehouse.read_table("fct_ceaps").await.unwrap();
    let [senador, valor] = fct.cols(["senador_id", "valor_reembolsado"]).unwrap();
    assert_eq!(fct.rows()[0][senador], Value::from("5012"));
    assert_eq!(
        fct.rows()[0][valor],
        Value::Decimal("2500.75".parse().unwrap())
    );
    // unparseable amounts stage as null rather than failing the row
    assert_eq!(fct.rows()[1][valor], Value::Null);
}
