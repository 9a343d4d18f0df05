//! Dashboard rollups. Always recomputed in full from the facts.

use warehouse_core::{Aggregate, GroupColumn, Relation, Rollup, Value};

use super::{Inputs, Layer, ModelDef};
use crate::error::Result;

/// Payroll type of the regular monthly sheet.
pub const REGULAR_PAYROLL: &str = "Normal";
pub const PHASE_COMMITMENT: &str = "Empenho";
pub const PHASE_PAYMENT: &str = "Pagamento";

pub fn models() -> Vec<ModelDef> {
    vec![
        ModelDef {
            name: "agg_remuneracao_mensal",
            layer: Layer::Aggregate,
            inputs: &["fct_remuneracao"],
            build: agg_remuneracao_mensal,
        },
        ModelDef {
            name: "agg_pensionistas_mensal",
            layer: Layer::Aggregate,
            inputs: &["fct_remuneracao_pensionista"],
            build: agg_pensionistas_mensal,
        },
        ModelDef {
            name: "agg_horas_extras_mensal",
            layer: Layer::Aggregate,
            inputs: &["fct_hora_extra"],
            build: agg_horas_extras_mensal,
        },
        ModelDef {
            name: "agg_ceaps_senador_mensal",
            layer: Layer::Aggregate,
            inputs: &["fct_ceaps"],
            build: agg_ceaps_senador_mensal,
        },
        ModelDef {
            name: "agg_emendas_autor_ano",
            layer: Layer::Aggregate,
            inputs: &["fct_emenda_documento"],
            build: agg_emendas_autor_ano,
        },
    ]
}

fn count(output: &str) -> Aggregate {
    Aggregate::Count {
        output: output.into(),
    }
}

fn distinct(column: &str, output: &str) -> Aggregate {
    Aggregate::CountDistinct {
        column: column.into(),
        output: output.into(),
    }
}

fn sum(column: &str, output: &str) -> Aggregate {
    Aggregate::Sum {
        column: column.into(),
        output: output.into(),
    }
}

pub fn remuneracao_mensal() -> Rollup {
    Rollup::new("agg_remuneracao_mensal")
        .group(GroupColumn::key("ano"))
        .group(GroupColumn::key("mes"))
        .group(GroupColumn::label("vinculo"))
        .group(GroupColumn::label("lotacao_sigla"))
        .aggregate(distinct("sequencial", "num_servidores"))
        .aggregate(sum("remuneracao_bruta", "total_bruto"))
        .aggregate(sum("remuneracao_liquida", "total_liquido"))
        .aggregate(sum("horas_extras", "total_horas_extras"))
        .aggregate(Aggregate::CountIf {
            column: "tipo_folha".into(),
            equals: Value::from(REGULAR_PAYROLL),
            output: "num_folhas_normais".into(),
        })
}

pub fn pensionistas_mensal() -> Rollup {
    Rollup::new("agg_pensionistas_mensal")
        .group(GroupColumn::key("ano"))
        .group(GroupColumn::key("mes"))
        .group(GroupColumn::label("vinculo"))
        .aggregate(distinct("sequencial", "num_pensionistas"))
        .aggregate(sum("remuneracao_bruta", "total_bruto"))
        .aggregate(sum("remuneracao_liquida", "total_liquido"))
}

/// Overtime by payment month and agency.
pub fn horas_extras_mensal() -> Rollup {
    Rollup::new("agg_horas_extras_mensal")
        .group(GroupColumn::key("ano_pagamento"))
        .group(GroupColumn::key("mes_pagamento"))
        .group(GroupColumn::label("lotacao_sigla"))
        .aggregate(distinct("sequencial", "num_servidores"))
        .aggregate(count("num_pagamentos"))
        .aggregate(sum("valor_total", "total_horas_extras"))
}

pub fn ceaps_senador_mensal() -> Rollup {
    Rollup::new("agg_ceaps_senador_mensal")
        .group(GroupColumn::label("senador_id"))
        .group(GroupColumn::key("ano"))
        .group(GroupColumn::key("mes"))
        .group(GroupColumn::label("tipo_despesa"))
        .aggregate(count("num_recibos"))
        .aggregate(sum("valor_reembolsado", "total_reembolsado"))
        .aggregate(distinct("cnpj_cpf", "num_fornecedores"))
}

pub fn emendas_autor_ano() -> Rollup {
    Rollup::new("agg_emendas_autor_ano")
        .group(GroupColumn::key("ano_emenda"))
        .group(GroupColumn::label("tipo_emenda"))
        .group(GroupColumn::label("nome_autor_emenda"))
        .aggregate(distinct("codigo_emenda", "num_emendas"))
        .aggregate(Aggregate::SumIf {
            column: "valor_empenhado".into(),
            when: "fase_despesa".into(),
            equals: Value::from(PHASE_COMMITMENT),
            output: "total_empenhado".into(),
        })
        .aggregate(Aggregate::SumIf {
            column: "valor_pago".into(),
            when: "fase_despesa".into(),
            equals: Value::from(PHASE_PAYMENT),
            output: "total_pago".into(),
        })
        .aggregate(Aggregate::CountIf {
            column: "fase_despesa".into(),
            equals: Value::from(PHASE_PAYMENT),
            output: "num_pagamentos".into(),
        })
        .aggregate(distinct("municipio_recurso", "num_municipios"))
        .aggregate(Aggregate::Any {
            column: "is_senador_atual".into(),
            output: "is_senador_atual".into(),
        })
}

pub fn agg_remuneracao_mensal(inputs: &Inputs) -> Result<Relation> {
    Ok(remuneracao_mensal().compute(inputs.get("fct_remuneracao")?)?)
}

pub fn agg_pensionistas_mensal(inputs: &Inputs) -> Result<Relation> {
    Ok(pensionistas_mensal().compute(inputs.get("fct_remuneracao_pensionista")?)?)
}

pub fn agg_horas_extras_mensal(inputs: &Inputs) -> Result<Relation> {
    Ok(horas_extras_mensal().compute(inputs.get("fct_hora_extra")?)?)
}

pub fn agg_ceaps_senador_mensal(inputs: &Inputs) -> Result<Relation> {
    Ok(ceaps_senador_mensal().compute(inputs.get("fct_ceaps")?)?)
}

pub fn agg_emendas_autor_ano(inputs: &Inputs) -> Result<Relation> {
    Ok(emendas_autor_ano().compute(inputs.get("fct_emenda_documento")?)?)
}
