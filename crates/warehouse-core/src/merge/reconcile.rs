//! Schema reconciliation between an existing table and a new build.

use crate::error::{Result, WarehouseError};
use crate::materialization::OnSchemaChange;
use crate::relation::Schema;
use crate::store::SchemaChange;

/// Changes that bring `existing` in line with `incoming` under `policy`.
///
/// A column whose incoming type is narrower than the stored one needs no
/// change: incoming values widen into it on conform. A type pair that widens
/// in neither direction cannot be represented and is fatal.
pub fn plan_schema_changes(
    table: &str,
    existing: &Schema,
    incoming: &Schema,
    policy: OnSchemaChange,
) -> Result<Vec<SchemaChange>> {
    let mut changes = Vec::new();

    for col in incoming.columns() {
        match existing.column(&col.name) {
            None => changes.push(SchemaChange::AddColumn(col.clone())),
            Some(old) if old.ty == col.ty => {}
            Some(old) if old.ty.can_widen_to(col.ty) => changes.push(SchemaChange::AlterType {
                column: col.name.clone(),
                from: old.ty,
                to: col.ty,
            }),
            Some(old) if col.ty.can_widen_to(old.ty) => {}
            Some(old) => {
                return Err(WarehouseError::IncompatibleTypeChange {
                    table: table.to_string(),
                    column: col.name.clone(),
                    from: old.ty,
                    to: col.ty,
                })
            }
        }
    }

    if policy == OnSchemaChange::SyncAllColumns {
        changes.extend(
            existing
                .names()
                .filter(|name| !incoming.contains(name))
                .map(|name| SchemaChange::DropColumn(name.to_string())),
        );
    }

    if policy == OnSchemaChange::Fail {
        let vanished: Vec<&str> = existing.names().filter(|n| !incoming.contains(n)).collect();
        if !changes.is_empty() || !vanished.is_empty() {
            return Err(WarehouseError::SchemaChangeRejected {
                table: table.to_string(),
                reason: describe(&changes, &vanished),
            });
        }
    }

    Ok(changes)
}

fn describe(changes: &[SchemaChange], vanished: &[&str]) -> String {
    let mut parts: Vec<String> = changes
        .iter()
        .map(|c| match c {
            SchemaChange::AddColumn(col) => format!("+{}", col.name),
            SchemaChange::DropColumn(name) => format!("-{name}"),
            SchemaChange::AlterType { column, from, to } => format!("{column}: {from}->{to}"),
        })
        .collect();
    parts.extend(vanished.iter().map(|n| format!("-{n}")));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{Column, ColumnType};

    fn existing() -> Schema {
        Schema::from_pairs(&[
            ("id", ColumnType::Integer),
            ("valor", ColumnType::Integer),
            ("obsoleto", ColumnType::Text),
        ])
    }

    fn incoming() -> Schema {
        Schema::from_pairs(&[
            ("id", ColumnType::Integer),
            ("valor", ColumnType::Decimal),
            ("novo", ColumnType::Text),
        ])
    }

    #[test]
    fn sync_all_columns_adds_widens_and_drops() {
        let changes =
            plan_schema_changes("t", &existing(), &incoming(), OnSchemaChange::SyncAllColumns)
                .unwrap();
        assert_eq!(
            changes,
            vec![
                SchemaChange::AlterType {
                    column: "valor".into(),
                    from: ColumnType::Integer,
                    to: ColumnType::Decimal
                },
                SchemaChange::AddColumn(Column::new("novo", ColumnType::Text)),
                SchemaChange::DropColumn("obsoleto".into()),
            ]
        );
    }

    #[test]
    fn append_keeps_target_only_columns() {
        let changes = plan_schema_changes(
            "t",
            &existing(),
            &incoming(),
            OnSchemaChange::AppendNewColumns,
        )
        .unwrap();
        assert!(!changes
            .iter()
            .any(|c| matches!(c, SchemaChange::DropColumn(_))));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn fail_policy_rejects_any_difference() {
        let err = plan_schema_changes("t", &existing(), &incoming(), OnSchemaChange::Fail)
            .unwrap_err();
        assert!(matches!(err, WarehouseError::SchemaChangeRejected { .. }));
        assert!(
            plan_schema_changes("t", &existing(), &existing(), OnSchemaChange::Fail)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn narrower_incoming_type_needs_no_change() {
        let stored = Schema::from_pairs(&[("valor", ColumnType::Decimal)]);
        let fresh = Schema::from_pairs(&[("valor", ColumnType::Integer)]);
        assert!(
            plan_schema_changes("t", &stored, &fresh, OnSchemaChange::SyncAllColumns)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn unrelated_types_are_fatal() {
        let stored = Schema::from_pairs(&[("data", ColumnType::Date)]);
        let fresh = Schema::from_pairs(&[("data", ColumnType::Integer)]);
        assert!(matches!(
            plan_schema_changes("t", &stored, &fresh, OnSchemaChange::SyncAllColumns),
            Err(WarehouseError::IncompatibleTypeChange { .. })
        ));
    }
}
