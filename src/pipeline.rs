//! Stage registry and run loop.
//!
//! Every staged table, dimension, fact and aggregate is a [`Stage`] declaring
//! the tables it reads. Stages run in a deterministic topological order; a
//! stage whose input failed or was skipped is itself skipped, while
//! independent stages carry on.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use warehouse_core::{LoadOutcome, MergeEngine, Warehouse, WarehouseError};

use crate::config::WarehouseConfig;
use crate::error::{PipelineError, Result};
use crate::models::{self, BuildFn, Inputs, Layer, ModelDef};
use crate::raw::RawSource;
use crate::staging::{self, StagingAdapter};

// ── Stages ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum StageKind {
    /// Cast one raw source into its `stg_*` table.
    Staging(StagingAdapter),
    /// Build a table from previously materialized tables.
    Model(BuildFn),
}

#[derive(Debug, Clone)]
pub struct Stage {
    /// Also the name of the table the stage materializes.
    pub name: String,
    pub layer: Layer,
    pub inputs: Vec<String>,
    pub kind: StageKind,
}

impl Stage {
    pub fn staging(adapter: StagingAdapter) -> Self {
        Self {
            name: adapter.table.to_string(),
            layer: Layer::Staging,
            inputs: Vec::new(),
            kind: StageKind::Staging(adapter),
        }
    }

    pub fn model(def: ModelDef) -> Self {
        Self {
            name: def.name.to_string(),
            layer: def.layer,
            inputs: def.inputs.iter().map(|s| s.to_string()).collect(),
            kind: StageKind::Model(def.build),
        }
    }
}

// ── Outcomes ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Built {
        rows: usize,
    },
    Merged {
        inserted: usize,
        updated: usize,
        total: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

impl From<LoadOutcome> for StepOutcome {
    fn from(outcome: LoadOutcome) -> Self {
        match outcome {
            LoadOutcome::Rebuilt { rows } => StepOutcome::Built { rows },
            LoadOutcome::Merged { stats, .. } => StepOutcome::Merged {
                inserted: stats.inserted,
                updated: stats.updated,
                total: stats.total,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub stage: String,
    pub layer: Layer,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn outcome(&self, stage: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| &s.outcome)
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rebuild incremental tables from scratch.
    pub full_refresh: bool,
    /// Run only these stages; empty runs everything. Inputs of a selected
    /// stage that are not selected are read from the warehouse as they are.
    pub select: Vec<String>,
}

// ── Pipeline ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pipeline {
    /// In execution order.
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Every staging adapter and model.
    pub fn standard() -> Result<Self> {
        let stages = staging::adapters()
            .into_iter()
            .map(Stage::staging)
            .chain(models::models().into_iter().map(Stage::model))
            .collect();
        Self::new(stages)
    }

    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        Ok(Self {
            stages: execution_order(stages)?,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub async fn run(
        &self,
        warehouse: &dyn Warehouse,
        raw: &dyn RawSource,
        config: &WarehouseConfig,
        options: &RunOptions,
    ) -> Result<RunReport> {
        let selected = self.selection(&options.select)?;
        info!(
            stages = selected.as_ref().map_or(self.stages.len(), |s| s.len()),
            full_refresh = options.full_refresh,
            "run started"
        );

        let mut report = RunReport::default();
        // stage name -> why its table must not be read downstream
        let mut unusable: BTreeMap<&str, &'static str> = BTreeMap::new();

        for stage in &self.stages {
            if selected
                .as_ref()
                .is_some_and(|s| !s.contains(stage.name.as_str()))
            {
                continue;
            }

            let blocked = stage
                .inputs
                .iter()
                .find_map(|input| unusable.get(input.as_str()).map(|why| (input, *why)));
            let outcome = match blocked {
                Some((input, why)) => {
                    let reason = format!("upstream {input} {why}");
                    warn!(stage = %stage.name, %reason, "stage skipped");
                    StepOutcome::Skipped { reason }
                }
                None => self.run_stage(stage, warehouse, raw, config, options).await,
            };

            match &outcome {
                StepOutcome::Skipped { .. } => {
                    unusable.insert(&stage.name, "was skipped");
                }
                StepOutcome::Failed { .. } => {
                    unusable.insert(&stage.name, "failed");
                }
                _ => {}
            }
            report.steps.push(StepReport {
                stage: stage.name.clone(),
                layer: stage.layer,
                outcome,
            });
        }

        info!(
            steps = report.steps.len(),
            failed = report.failed().count(),
            skipped = report.skipped().count(),
            "run finished"
        );
        Ok(report)
    }

    fn selection<'a>(&self, select: &'a [String]) -> Result<Option<BTreeSet<&'a str>>> {
        if select.is_empty() {
            return Ok(None);
        }
        let mut names = BTreeSet::new();
        for name in select {
            if self.stage(name).is_none() {
                return Err(PipelineError::UnknownStage(name.clone()));
            }
            names.insert(name.as_str());
        }
        Ok(Some(names))
    }

    #[instrument(skip_all, fields(stage = %stage.name, layer = stage.layer.as_str()))]
    async fn run_stage(
        &self,
        stage: &Stage,
        warehouse: &dyn Warehouse,
        raw: &dyn RawSource,
        config: &WarehouseConfig,
        options: &RunOptions,
    ) -> StepOutcome {
        match self
            .build_and_load(stage, warehouse, raw, config, options)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, data_error = e.is_data_error(), "stage failed");
                StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn build_and_load(
        &self,
        stage: &Stage,
        warehouse: &dyn Warehouse,
        raw: &dyn RawSource,
        config: &WarehouseConfig,
        options: &RunOptions,
    ) -> Result<StepOutcome> {
        let built = match &stage.kind {
            StageKind::Staging(adapter) => match raw.load(adapter.source)? {
                Some(records) => adapter.stage(&records)?,
                None => {
                    let reason =
                        PipelineError::SourceUnavailable(adapter.source.to_string()).to_string();
                    warn!(source = adapter.source, "no raw extract, stage skipped");
                    return Ok(StepOutcome::Skipped { reason });
                }
            },
            StageKind::Model(build) => {
                let mut inputs = Inputs::new();
                for input in &stage.inputs {
                    if !warehouse.table_exists(input).await? {
                        warn!(table = %input, "input table missing, stage skipped");
                        return Ok(StepOutcome::Skipped {
                            reason: format!("input table {input} does not exist"),
                        });
                    }
                    inputs.insert(warehouse.read_table(input).await?.renamed(input.as_str()));
                }
                build(&inputs)?
            }
        };

        let materialization = config.materialization(&stage.name);
        let outcome = MergeEngine::new(warehouse)
            .materialize(&stage.name, &materialization, options.full_refresh, built)
            .await?;
        Ok(outcome.into())
    }
}

/// Kahn's algorithm; among ready stages the lowest (layer, name) goes first.
fn execution_order(stages: Vec<Stage>) -> Result<Vec<Stage>> {
    let mut by_name: BTreeMap<String, Stage> = BTreeMap::new();
    for stage in stages {
        let name = stage.name.clone();
        if by_name.insert(name.clone(), stage).is_some() {
            return Err(
                WarehouseError::InvalidConfig(format!("stage {name} defined twice")).into(),
            );
        }
    }

    let order: Vec<String> = {
        let mut indegree: BTreeMap<&str, usize> =
            by_name.keys().map(|n| (n.as_str(), 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for stage in by_name.values() {
            for input in &stage.inputs {
                if !by_name.contains_key(input) {
                    return Err(PipelineError::UnknownStage(format!(
                        "{input} (input of {})",
                        stage.name
                    )));
                }
                dependents
                    .entry(input.as_str())
                    .or_default()
                    .push(stage.name.as_str());
                *indegree.entry(stage.name.as_str()).or_default() += 1;
            }
        }

        let mut ready: BTreeSet<(Layer, &str)> = by_name
            .values()
            .filter(|s| indegree.get(s.name.as_str()) == Some(&0))
            .map(|s| (s.layer, s.name.as_str()))
            .collect();
        let mut order = Vec::with_capacity(by_name.len());
        while let Some((_, name)) = ready.pop_first() {
            order.push(name.to_string());
            for &dependent in dependents.get(name).into_iter().flatten() {
                let Some(d) = indegree.get_mut(dependent) else {
                    continue;
                };
                *d -= 1;
                if *d == 0 {
                    if let Some(stage) = by_name.get(dependent) {
                        ready.insert((stage.layer, dependent));
                    }
                }
            }
        }

        if order.len() < by_name.len() {
            let stuck: Vec<&str> = indegree
                .iter()
                .filter(|(_, &d)| d > 0)
                .map(|(n, _)| *n)
                .collect();
            return Err(PipelineError::DependencyCycle(stuck.join(", ")));
        }
        order
    };

    Ok(order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect())
}

#[cfg(test)]
mod tests {
    use warehouse_core::{ColumnType, Relation, Schema};

    use super::*;

    fn noop(_: &Inputs) -> Result<Relation> {
        Ok(Relation::new(
            "noop",
            Schema::from_pairs(&[("x", ColumnType::Integer)]),
        ))
    }

    fn model(name: &'static str, layer: Layer, inputs: &'static [&'static str]) -> Stage {
        Stage::model(ModelDef {
            name,
            layer,
            inputs,
            build: noop,
        })
    }

    fn position(p: &Pipeline, name: &str) -> usize {
        p.stages().iter().position(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_standard_order_respects_dependencies() {
        let p = Pipeline::standard().unwrap();
        for stage in p.stages() {
            for input in &stage.inputs {
                assert!(
                    position(&p, input) < position(&p, &stage.name),
                    "{input} must run before {}",
                    stage.name
                );
            }
        }
        // staging first, aggregates last
        assert_eq!(p.stages()[0].layer, Layer::Staging);
        assert_eq!(p.stages().last().unwrap().layer, Layer::Aggregate);
    }

    #[test]
    fn test_ties_break_by_layer_then_name() {
        let p = Pipeline::new(vec![
            model("b_fact", Layer::Fact, &[]),
            model("z_dim", Layer::Dimension, &[]),
            model("a_fact", Layer::Fact, &[]),
        ])
        .unwrap();
        let names: Vec<_> = p.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["z_dim", "a_fact", "b_fact"]);
    }

    #[test]
    fn test_unknown_input_is_rejected() {
        let err = Pipeline::new(vec![model("fct", Layer::Fact, &["dim_missing"])]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStage(ref s) if s.contains("dim_missing")));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Pipeline::new(vec![
            model("a", Layer::Fact, &["b"]),
            model("b", Layer::Fact, &["a"]),
            model("c", Layer::Dimension, &[]),
        ])
        .unwrap_err();
        match err {
            PipelineError::DependencyCycle(stuck) => assert_eq!(stuck, "a, b"),
            other => panic!("expected a cycle, got {other}"),
        }
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let step = StepReport {
            stage: "fct_ceaps".into(),
            layer: Layer::Fact,
            outcome: StepOutcome::Merged {
                inserted: 2,
                updated: 1,
                total: 10,
            },
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "merged");
        assert_eq!(json["layer"], "fact");
        assert_eq!(json["inserted"], 2);
    }
}
