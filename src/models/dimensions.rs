//! Dimensions: full-refresh snapshots of current legislators and staff, and
//! the resolved amendment dimension.

use std::collections::BTreeMap;

use warehouse_core::{ColumnType, Relation, Schema, Value};

use super::{Inputs, Layer, ModelDef};
use crate::entity_resolution::{normalize_name, select_representatives, EntityResolver, Precedence};
use crate::error::Result;

pub fn models() -> Vec<ModelDef> {
    vec![
        ModelDef {
            name: "dim_senador",
            layer: Layer::Dimension,
            inputs: &["stg_senadores"],
            build: dim_senador,
        },
        ModelDef {
            name: "dim_deputado",
            layer: Layer::Dimension,
            inputs: &["stg_deputados"],
            build: dim_deputado,
        },
        ModelDef {
            name: "dim_servidor",
            layer: Layer::Dimension,
            inputs: &["stg_servidores"],
            build: dim_servidor,
        },
        ModelDef {
            name: "dim_pensionista",
            layer: Layer::Dimension,
            inputs: &["stg_pensionistas"],
            build: dim_pensionista,
        },
        ModelDef {
            name: "dim_partido",
            layer: Layer::Dimension,
            inputs: &["dim_senador", "dim_deputado"],
            build: dim_partido,
        },
        ModelDef {
            name: "dim_emenda",
            layer: Layer::Dimension,
            inputs: &["stg_emendas_documentos", "dim_senador", "dim_deputado"],
            build: dim_emenda,
        },
    ]
}

/// One row per senator. The listing has one row per mandate, so a
/// re-elected senator is represented by the most recent mandate.
pub fn dim_senador(inputs: &Inputs) -> Result<Relation> {
    let stg = select_representatives(
        inputs.get("stg_senadores")?,
        "senador_id",
        &Precedence::latest_first(&["mandato_inicio", "mandato_fim"]),
    )?;
    let [id, nome, completo, sexo, partido, uf, email, nascimento] = stg.cols([
        "senador_id",
        "nome_parlamentar",
        "nome_completo",
        "sexo",
        "partido_sigla",
        "estado_sigla",
        "email",
        "data_nascimento",
    ])?;
    let [foto, pagina, inicio, fim, participacao, exercicio] = stg.cols([
        "foto_url",
        "pagina_url",
        "mandato_inicio",
        "mandato_fim",
        "descricao_participacao",
        "em_exercicio",
    ])?;

    let schema = Schema::from_pairs(&[
        ("senador_id", ColumnType::Text),
        ("nome_parlamentar", ColumnType::Text),
        ("nome_completo", ColumnType::Text),
        ("nome_normalizado", ColumnType::Text),
        ("partido_sigla", ColumnType::Text),
        ("estado_sigla", ColumnType::Text),
        ("sexo", ColumnType::Text),
        ("email", ColumnType::Text),
        ("data_nascimento", ColumnType::Date),
        ("foto_url", ColumnType::Text),
        ("pagina_url", ColumnType::Text),
        ("mandato_inicio", ColumnType::Date),
        ("mandato_fim", ColumnType::Date),
        ("descricao_participacao", ColumnType::Text),
        ("em_exercicio", ColumnType::Boolean),
    ]);
    let mut out = Relation::new("dim_senador", schema);
    for row in stg.rows() {
        out.push(vec![
            row[id].clone(),
            row[nome].clone(),
            row[completo].clone(),
            Value::Text(normalize_name(row[nome].as_text())),
            row[partido].clone(),
            row[uf].clone(),
            row[sexo].clone(),
            row[email].clone(),
            row[nascimento].clone(),
            row[foto].clone(),
            row[pagina].clone(),
            row[inicio].clone(),
            row[fim].clone(),
            row[participacao].clone(),
            // unflagged rows come from the in-office listing
            Value::Bool(row[exercicio].as_bool().unwrap_or(true)),
        ])?;
    }
    Ok(out)
}

/// One row per deputy; a deputy listed under several legislatures is
/// represented by the most recent one.
pub fn dim_deputado(inputs: &Inputs) -> Result<Relation> {
    let stg = select_representatives(
        inputs.get("stg_deputados")?,
        "deputado_id",
        &Precedence::latest_first(&["id_legislatura"]),
    )?;
    let [id, nome, civil, partido, uf, legislatura, situacao, email] = stg.cols([
        "deputado_id",
        "nome_parlamentar",
        "nome_civil",
        "sigla_partido",
        "sigla_uf",
        "id_legislatura",
        "situacao",
        "email",
    ])?;

    let schema = Schema::from_pairs(&[
        ("deputado_id", ColumnType::Text),
        ("nome_parlamentar", ColumnType::Text),
        ("nome_civil", ColumnType::Text),
        ("nome_normalizado", ColumnType::Text),
        ("partido_sigla", ColumnType::Text),
        ("estado_sigla", ColumnType::Text),
        ("id_legislatura", ColumnType::Integer),
        ("situacao", ColumnType::Text),
        ("email", ColumnType::Text),
    ]);
    let mut out = Relation::new("dim_deputado", schema);
    for row in stg.rows() {
        out.push(vec![
            row[id].clone(),
            row[nome].clone(),
            row[civil].clone(),
            Value::Text(normalize_name(row[nome].as_text())),
            row[partido].clone(),
            row[uf].clone(),
            row[legislatura].clone(),
            row[situacao].clone(),
            row[email].clone(),
        ])?;
    }
    Ok(out)
}

pub fn dim_servidor(inputs: &Inputs) -> Result<Relation> {
    let stg = select_representatives(
        inputs.get("stg_servidores")?,
        "sequencial",
        &Precedence::latest_first(&["ano_admissao"]),
    )?;
    Ok(stg.renamed("dim_servidor"))
}

pub fn dim_pensionista(inputs: &Inputs) -> Result<Relation> {
    let stg = select_representatives(
        inputs.get("stg_pensionistas")?,
        "sequencial",
        &Precedence::latest_first(&["ano_exercicio"]),
    )?;
    Ok(stg.renamed("dim_pensionista"))
}

/// Parties with a sitting senator or a deputy, with head counts per house.
pub fn dim_partido(inputs: &Inputs) -> Result<Relation> {
    let senators = inputs.get("dim_senador")?;
    let deputies = inputs.get("dim_deputado")?;
    let [sen_partido, sen_exercicio] = senators.cols(["partido_sigla", "em_exercicio"])?;
    let dep_partido = deputies.col("partido_sigla")?;

    let mut counts: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for row in senators.rows() {
        if row[sen_exercicio].as_bool() != Some(true) {
            continue;
        }
        if let Some(sigla) = row[sen_partido].as_text() {
            counts.entry(sigla).or_default().0 += 1;
        }
    }
    for row in deputies.rows() {
        if let Some(sigla) = row[dep_partido].as_text() {
            counts.entry(sigla).or_default().1 += 1;
        }
    }

    let schema = Schema::from_pairs(&[
        ("partido_sigla", ColumnType::Text),
        ("num_senadores", ColumnType::Integer),
        ("num_deputados", ColumnType::Integer),
    ]);
    let mut out = Relation::new("dim_partido", schema);
    for (sigla, (senadores, deputados)) in counts {
        out.push(vec![sigla.into(), senadores.into(), deputados.into()])?;
    }
    Ok(out)
}

pub fn dim_emenda(inputs: &Inputs) -> Result<Relation> {
    let resolver =
        EntityResolver::from_dimensions(inputs.get("dim_senador")?, inputs.get("dim_deputado")?)?;
    resolver.resolve_amendments(inputs.get("stg_emendas_documentos")?)
}
