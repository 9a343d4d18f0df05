//! Fact models. Each builds its full candidate set; the merge engine narrows
//! it to the watermark window for incremental runs.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use warehouse_core::{Column, ColumnType, Relation, Row, Schema, Value};

use super::{retain_non_null, Inputs, Layer, ModelDef};
use crate::entity_resolution::{select_representatives, Precedence};
use crate::error::Result;

pub fn models() -> Vec<ModelDef> {
    vec![
        ModelDef {
            name: "fct_ceaps",
            layer: Layer::Fact,
            inputs: &["stg_ceaps", "dim_senador"],
            build: fct_ceaps,
        },
        ModelDef {
            name: "fct_votacao",
            layer: Layer::Fact,
            inputs: &["stg_votos", "stg_votacoes", "dim_senador"],
            build: fct_votacao,
        },
        ModelDef {
            name: "fct_remuneracao",
            layer: Layer::Fact,
            inputs: &["stg_remuneracoes", "dim_servidor"],
            build: fct_remuneracao,
        },
        ModelDef {
            name: "fct_remuneracao_pensionista",
            layer: Layer::Fact,
            inputs: &["stg_remuneracoes_pensionistas", "dim_pensionista"],
            build: fct_remuneracao_pensionista,
        },
        ModelDef {
            name: "fct_hora_extra",
            layer: Layer::Fact,
            inputs: &["stg_horas_extras", "dim_servidor"],
            build: fct_hora_extra,
        },
        ModelDef {
            name: "fct_emenda_documento",
            layer: Layer::Fact,
            inputs: &["stg_emendas_documentos", "dim_emenda"],
            build: fct_emenda_documento,
        },
    ]
}

// ── Join helpers ───────────────────────────────────────────────

/// Non-null text values of `column`.
fn id_set(relation: &Relation, column: &str) -> Result<HashSet<String>> {
    let idx = relation.col(column)?;
    Ok(relation
        .rows()
        .iter()
        .filter_map(|r| r[idx].as_text().map(str::to_string))
        .collect())
}

/// First row per non-null value of `column`. Callers pass relations that are
/// unique on `column`.
fn index_by<'a>(relation: &'a Relation, column: &str) -> Result<HashMap<&'a Value, &'a Row>> {
    let idx = relation.col(column)?;
    let mut map = HashMap::with_capacity(relation.len());
    for row in relation.rows() {
        if !row[idx].is_null() {
            map.entry(&row[idx]).or_insert(row);
        }
    }
    Ok(map)
}

/// Output schema: `base` columns of `source` in order, then `extra`.
fn extend_schema(source: &Schema, base: &[&str], extra: &[(&str, ColumnType)]) -> Schema {
    let mut columns: Vec<Column> = base
        .iter()
        .filter_map(|name| source.column(name).cloned())
        .collect();
    columns.extend(extra.iter().map(|(n, ty)| Column::new(*n, *ty)));
    Schema::new(columns)
}

fn lookup<'a>(row: Option<&&'a Row>, idx: usize) -> Value {
    row.map(|r| r[idx].clone()).unwrap_or(Value::Null)
}

// ── fct_ceaps ──────────────────────────────────────────────────

const CEAPS_COLUMNS: &[&str] = &[
    "id",
    "ano",
    "mes",
    "data",
    "cod_senador",
    "nome_senador",
    "tipo_despesa",
    "tipo_documento",
    "cnpj_cpf",
    "fornecedor",
    "documento",
    "detalhamento",
    "valor_reembolsado",
];

pub fn fct_ceaps(inputs: &Inputs) -> Result<Relation> {
    let stg = retain_non_null(inputs.get("stg_ceaps")?.clone(), &["id"])?;
    let senators = id_set(inputs.get("dim_senador")?, "senador_id")?;

    let base = CEAPS_COLUMNS
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [ano, mes, data, cod] = stg.cols(["ano", "mes", "data", "cod_senador"])?;
    let schema = extend_schema(
        stg.schema(),
        CEAPS_COLUMNS,
        &[("senador_id", ColumnType::Text)],
    );
    let (ano_out, mes_out) = (1, 2);

    let mut out = Relation::new("fct_ceaps", schema);
    for row in stg.rows() {
        let mut values: Row = base.iter().map(|&i| row[i].clone()).collect();
        if let Some(date) = row[data].as_date() {
            if row[ano].is_null() {
                values[ano_out] = Value::Int(i64::from(date.year()));
            }
            if row[mes].is_null() {
                values[mes_out] = Value::Int(i64::from(date.month()));
            }
        }
        let senador_id = row[cod]
            .as_text()
            .filter(|id| senators.contains(*id))
            .map(|id| Value::Text(id.to_string()))
            .unwrap_or(Value::Null);
        values.push(senador_id);
        out.push(values)?;
    }
    Ok(out)
}

// ── fct_votacao ────────────────────────────────────────────────

const VOTE_COLUMNS: &[&str] = &[
    "codigo_sessao_votacao",
    "codigo_parlamentar",
    "nome_parlamentar",
    "sigla_partido",
    "sigla_uf",
    "sigla_voto",
    "descricao_voto",
];

const SESSION_COLUMNS: &[&str] = &[
    "data_sessao",
    "codigo_materia",
    "sigla_materia",
    "numero_materia",
    "ano_materia",
    "descricao_votacao",
    "resultado_votacao",
    "votacao_secreta",
];

/// One row per senator vote, carrying the session date and matter.
pub fn fct_votacao(inputs: &Inputs) -> Result<Relation> {
    let votes = retain_non_null(
        inputs.get("stg_votos")?.clone(),
        &["codigo_sessao_votacao", "codigo_parlamentar"],
    )?;
    // A session may be listed once per matter page; keep the latest record.
    let sessions = select_representatives(
        inputs.get("stg_votacoes")?,
        "codigo_sessao_votacao",
        &Precedence::latest_first(&["data_sessao"]),
    )?;
    let senators = id_set(inputs.get("dim_senador")?, "senador_id")?;
    let by_session = index_by(&sessions, "codigo_sessao_votacao")?;

    let vote_idx = VOTE_COLUMNS
        .iter()
        .map(|c| votes.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let session_idx = SESSION_COLUMNS
        .iter()
        .map(|c| sessions.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [session, parlamentar] = votes.cols(["codigo_sessao_votacao", "codigo_parlamentar"])?;

    let mut columns: Vec<Column> = VOTE_COLUMNS
        .iter()
        .filter_map(|c| votes.schema().column(c).cloned())
        .collect();
    columns.push(Column::new("senador_id", ColumnType::Text));
    columns.extend(
        SESSION_COLUMNS
            .iter()
            .filter_map(|c| sessions.schema().column(c).cloned()),
    );

    let mut out = Relation::new("fct_votacao", Schema::new(columns));
    for row in votes.rows() {
        let mut values: Row = vote_idx.iter().map(|&i| row[i].clone()).collect();
        let senador_id = row[parlamentar]
            .as_int()
            .map(|code| code.to_string())
            .filter(|id| senators.contains(id))
            .map(Value::Text)
            .unwrap_or(Value::Null);
        values.push(senador_id);
        let matched = by_session.get(&row[session]);
        values.extend(session_idx.iter().map(|&i| lookup(matched, i)));
        out.push(values)?;
    }
    Ok(out)
}

// ── fct_remuneracao ────────────────────────────────────────────

const PAYROLL_KEY: &[&str] = &["sequencial", "ano", "mes", "tipo_folha"];

pub const GROSS_COMPONENTS: &[&str] = &[
    "remuneracao_basica",
    "vantagens_pessoais",
    "funcao_comissionada",
    "gratificacao_natalina",
    "horas_extras",
    "outras_eventuais",
    "abono_permanencia",
];

pub const DEDUCTIONS: &[&str] = &[
    "faltas",
    "previdencia",
    "reversao_teto_constitucional",
    "imposto_renda",
];

const OTHER_PAY: &[&str] = &["diarias", "auxilios", "vantagens_indenizatorias"];

/// Sum of the non-null parts; null when every part is null.
pub fn sum_present(parts: impl IntoIterator<Item = Option<Decimal>>) -> Option<Decimal> {
    parts
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v))
}

/// Sourced net pay wins; otherwise gross less whatever deductions are known.
pub fn net_pay(
    sourced: Option<Decimal>,
    gross: Option<Decimal>,
    deductions: Option<Decimal>,
) -> Option<Decimal> {
    sourced.or_else(|| gross.map(|g| g - deductions.unwrap_or(Decimal::ZERO)))
}

/// First day of the competency month.
pub fn competency_date(ano: Option<i64>, mes: Option<i64>) -> Option<NaiveDate> {
    let year = i32::try_from(ano?).ok()?;
    let month = u32::try_from(mes?).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn fct_remuneracao(inputs: &Inputs) -> Result<Relation> {
    let stg = retain_non_null(inputs.get("stg_remuneracoes")?.clone(), PAYROLL_KEY)?;
    let staff = inputs.get("dim_servidor")?;
    let by_sequencial = index_by(staff, "sequencial")?;
    let [vinculo, lotacao] = staff.cols(["vinculo", "lotacao_sigla"])?;

    let passthrough: Vec<&str> = PAYROLL_KEY
        .iter()
        .chain(std::iter::once(&"nome"))
        .chain(GROSS_COMPONENTS)
        .chain(OTHER_PAY)
        .chain(DEDUCTIONS)
        .copied()
        .collect();
    let base = passthrough
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let gross_idx = GROSS_COMPONENTS
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let deduction_idx = DEDUCTIONS
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [sequencial, ano, mes, liquida] =
        stg.cols(["sequencial", "ano", "mes", "remuneracao_liquida"])?;

    let schema = extend_schema(
        stg.schema(),
        &passthrough,
        &[
            ("data_competencia", ColumnType::Date),
            ("vinculo", ColumnType::Text),
            ("lotacao_sigla", ColumnType::Text),
            ("remuneracao_bruta", ColumnType::Decimal),
            ("total_descontos", ColumnType::Decimal),
            ("remuneracao_liquida", ColumnType::Decimal),
        ],
    );

    let mut out = Relation::new("fct_remuneracao", schema);
    for row in stg.rows() {
        let mut values: Row = base.iter().map(|&i| row[i].clone()).collect();
        let gross = sum_present(gross_idx.iter().map(|&i| row[i].as_decimal()));
        let deductions = sum_present(deduction_idx.iter().map(|&i| row[i].as_decimal()));
        let net = net_pay(row[liquida].as_decimal(), gross, deductions);
        let servidor = by_sequencial.get(&row[sequencial]);

        values.push(competency_date(row[ano].as_int(), row[mes].as_int()).into());
        values.push(lookup(servidor, vinculo));
        values.push(lookup(servidor, lotacao));
        values.push(gross.into());
        values.push(deductions.into());
        values.push(net.into());
        out.push(values)?;
    }
    Ok(out)
}

// ── fct_remuneracao_pensionista ────────────────────────────────

const PENSION_GROSS: &[&str] = &[
    "remuneracao_basica",
    "vantagens_pessoais",
    "funcao_comissionada",
    "gratificacao_natalina",
];

const PENSION_DEDUCTIONS: &[&str] = &[
    "previdencia",
    "reversao_teto_constitucional",
    "imposto_renda",
];

/// Pension payroll, keyed like staff payroll. Gross and net follow the
/// staff rules over the components a pension sheet carries.
pub fn fct_remuneracao_pensionista(inputs: &Inputs) -> Result<Relation> {
    let stg = retain_non_null(
        inputs.get("stg_remuneracoes_pensionistas")?.clone(),
        PAYROLL_KEY,
    )?;
    let pensioners = inputs.get("dim_pensionista")?;
    let by_sequencial = index_by(pensioners, "sequencial")?;
    let [vinculo, instituidor] = pensioners.cols(["vinculo", "nome_instituidor"])?;

    let passthrough: Vec<&str> = PAYROLL_KEY
        .iter()
        .chain(std::iter::once(&"nome"))
        .chain(PENSION_GROSS)
        .chain(std::iter::once(&"vantagens_indenizatorias"))
        .chain(PENSION_DEDUCTIONS)
        .copied()
        .collect();
    let base = passthrough
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let gross_idx = PENSION_GROSS
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let deduction_idx = PENSION_DEDUCTIONS
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [sequencial, ano, mes, liquida] =
        stg.cols(["sequencial", "ano", "mes", "remuneracao_liquida"])?;

    let schema = extend_schema(
        stg.schema(),
        &passthrough,
        &[
            ("data_competencia", ColumnType::Date),
            ("vinculo", ColumnType::Text),
            ("nome_instituidor", ColumnType::Text),
            ("remuneracao_bruta", ColumnType::Decimal),
            ("total_descontos", ColumnType::Decimal),
            ("remuneracao_liquida", ColumnType::Decimal),
        ],
    );

    let mut out = Relation::new("fct_remuneracao_pensionista", schema);
    for row in stg.rows() {
        let mut values: Row = base.iter().map(|&i| row[i].clone()).collect();
        let gross = sum_present(gross_idx.iter().map(|&i| row[i].as_decimal()));
        let deductions = sum_present(deduction_idx.iter().map(|&i| row[i].as_decimal()));
        let pensioner = by_sequencial.get(&row[sequencial]);

        values.push(competency_date(row[ano].as_int(), row[mes].as_int()).into());
        values.push(lookup(pensioner, vinculo));
        values.push(lookup(pensioner, instituidor));
        values.push(gross.into());
        values.push(deductions.into());
        values.push(net_pay(row[liquida].as_decimal(), gross, deductions).into());
        out.push(values)?;
    }
    Ok(out)
}

// ── fct_hora_extra ─────────────────────────────────────────────

const OVERTIME_KEY: &[&str] = &[
    "sequencial",
    "ano_pagamento",
    "mes_pagamento",
    "mes_ano_prestacao",
];

/// Overtime payments, one row per staff member, payment month and month
/// worked. Bond and agency come from `dim_servidor`.
pub fn fct_hora_extra(inputs: &Inputs) -> Result<Relation> {
    let stg = retain_non_null(inputs.get("stg_horas_extras")?.clone(), OVERTIME_KEY)?;
    let staff = inputs.get("dim_servidor")?;
    let by_sequencial = index_by(staff, "sequencial")?;
    let [vinculo, lotacao] = staff.cols(["vinculo", "lotacao_sigla"])?;

    let passthrough: Vec<&str> = OVERTIME_KEY
        .iter()
        .chain(&["nome", "mes_ano_pagamento", "valor_total"])
        .copied()
        .collect();
    let base = passthrough
        .iter()
        .map(|c| stg.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let [sequencial, ano, mes] = stg.cols(["sequencial", "ano_pagamento", "mes_pagamento"])?;

    let schema = extend_schema(
        stg.schema(),
        &passthrough,
        &[
            ("data_pagamento", ColumnType::Date),
            ("vinculo", ColumnType::Text),
            ("lotacao_sigla", ColumnType::Text),
        ],
    );

    let mut out = Relation::new("fct_hora_extra", schema);
    for row in stg.rows() {
        let mut values: Row = base.iter().map(|&i| row[i].clone()).collect();
        let servidor = by_sequencial.get(&row[sequencial]);
        values.push(competency_date(row[ano].as_int(), row[mes].as_int()).into());
        values.push(lookup(servidor, vinculo));
        values.push(lookup(servidor, lotacao));
        out.push(values)?;
    }
    Ok(out)
}

// ── fct_emenda_documento ───────────────────────────────────────

const AUTHORSHIP_COLUMNS: &[&str] = &[
    "senador_id",
    "senador_nome",
    "is_senador_atual",
    "deputado_id",
    "deputado_nome",
    "is_deputado_atual",
    "partido_sigla",
    "estado_sigla",
];

/// Documents with the authorship already resolved on `dim_emenda`.
pub fn fct_emenda_documento(inputs: &Inputs) -> Result<Relation> {
    let docs = retain_non_null(
        inputs.get("stg_emendas_documentos")?.clone(),
        &["codigo_emenda", "codigo_documento", "fase_despesa"],
    )?;
    let dim = inputs.get("dim_emenda")?;
    let by_code = index_by(dim, "codigo_emenda")?;
    let code = docs.col("codigo_emenda")?;
    let dim_idx = AUTHORSHIP_COLUMNS
        .iter()
        .map(|c| dim.col(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut columns = docs.schema().columns().to_vec();
    columns.extend(
        AUTHORSHIP_COLUMNS
            .iter()
            .filter_map(|c| dim.schema().column(c).cloned()),
    );

    let mut out = Relation::new("fct_emenda_documento", Schema::new(columns));
    for row in docs.rows() {
        let mut values = row.clone();
        let amendment = by_code.get(&row[code]);
        for (name, &i) in AUTHORSHIP_COLUMNS.iter().zip(&dim_idx) {
            let v = match (lookup(amendment, i), name.starts_with("is_")) {
                (Value::Null, true) => Value::Bool(false),
                (v, _) => v,
            };
            values.push(v);
        }
        out.push(values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::dimensions;
    use crate::staging::adapter_for_table;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn staged(table: &str, values: Vec<serde_json::Value>) -> Relation {
        let records: Vec<_> = values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Object(m) => Some(m),
                _ => None,
            })
            .collect();
        adapter_for_table(table).unwrap().stage(&records).unwrap()
    }

    fn senators() -> Relation {
        let inputs = Inputs::new().with(staged(
            "stg_senadores",
            vec![json!({"senador_id": "5012", "nome_parlamentar": "Fulano de Tal"})],
        ));
        dimensions::dim_senador(&inputs).unwrap()
    }

    #[test]
    fn test_gross_and_net_pay() {
        assert_eq!(sum_present([None, None]), None);
        assert_eq!(sum_present([Some(d("1.5")), None, Some(d("2"))]), Some(d("3.5")));
        assert_eq!(net_pay(Some(d("10")), Some(d("99")), None), Some(d("10")));
        assert_eq!(net_pay(None, Some(d("100")), Some(d("30"))), Some(d("70")));
        assert_eq!(net_pay(None, Some(d("100")), None), Some(d("100")));
        assert_eq!(net_pay(None, None, Some(d("30"))), None);
    }

    #[test]
    fn test_competency_date() {
        assert_eq!(
            competency_date(Some(2024), Some(3)),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(competency_date(Some(2024), Some(13)), None);
        assert_eq!(competency_date(None, Some(1)), None);
    }

    #[test]
    fn test_ceaps_links_known_senators_and_derives_month() {
        let inputs = Inputs::new()
            .with(senators())
            .with(staged(
                "stg_ceaps",
                vec![
                    json!({"id": 1, "cod_senador": "5012", "data": "15/02/2023", "valor_reembolsado": "1.234,50"}),
                    json!({"id": 2, "ano": 2022, "mes": 7, "cod_senador": "9999", "data": "2023-01-01"}),
                    json!({"cod_senador": "5012"}),
                ],
            ));
        let fct = fct_ceaps(&inputs).unwrap();
        assert_eq!(fct.len(), 2);
        let [ano, mes, senador, valor] = fct
            .cols(["ano", "mes", "senador_id", "valor_reembolsado"])
            .unwrap();
        let first = &fct.rows()[0];
        assert_eq!(first[ano], Value::Int(2023));
        assert_eq!(first[mes], Value::Int(2));
        assert_eq!(first[senador], Value::Text("5012".into()));
        assert_eq!(first[valor], Value::Decimal(d("1234.50")));
        let second = &fct.rows()[1];
        assert_eq!(second[ano], Value::Int(2022));
        assert_eq!(second[mes], Value::Int(7));
        assert_eq!(second[senador], Value::Null);
    }

    #[test]
    fn test_votes_join_session_date() {
        let inputs = Inputs::new()
            .with(senators())
            .with(staged(
                "stg_votos",
                vec![
                    json!({"codigo_sessao_votacao": 7, "codigo_parlamentar": 5012, "sigla_voto": "Sim"}),
                    json!({"codigo_sessao_votacao": 8, "codigo_parlamentar": 1, "sigla_voto": "Não"}),
                ],
            ))
            .with(staged(
                "stg_votacoes",
                vec![json!({"codigo_sessao_votacao": 7, "data_sessao": "2024-05-02", "votacao_secreta": "N"})],
            ));
        let fct = fct_votacao(&inputs).unwrap();
        let [senador, data, secreta] = fct
            .cols(["senador_id", "data_sessao", "votacao_secreta"])
            .unwrap();
        assert_eq!(fct.rows()[0][senador], Value::Text("5012".into()));
        assert_eq!(
            fct.rows()[0][data],
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
        );
        assert_eq!(fct.rows()[0][secreta], Value::Bool(false));
        assert_eq!(fct.rows()[1][senador], Value::Null);
        assert_eq!(fct.rows()[1][data], Value::Null);
    }

    #[test]
    fn test_payroll_denormalizes_staff() {
        let inputs = Inputs::new()
            .with(
                staged(
                    "stg_servidores",
                    vec![json!({"sequencial": 42, "vinculo": "EFETIVO", "lotacao_sigla": "SGM"})],
                )
                .renamed("dim_servidor"),
            )
            .with(staged(
                "stg_remuneracoes",
                vec![
                    json!({"sequencial": 42, "ano": 2024, "mes": 1, "tipo_folha": "Normal",
                           "remuneracao_basica": "10.000,00", "horas_extras": "500,00",
                           "previdencia": "1.100,00", "imposto_renda": "2.000,00"}),
                    json!({"sequencial": 43, "ano": 2024, "mes": 1, "tipo_folha": "Normal",
                           "remuneracao_basica": "5.000,00", "remuneracao_liquida": "4.000,00"}),
                ],
            ));
        let fct = fct_remuneracao(&inputs).unwrap();
        let [bruta, descontos, liquida, vinculo, competencia] = fct
            .cols([
                "remuneracao_bruta",
                "total_descontos",
                "remuneracao_liquida",
                "vinculo",
                "data_competencia",
            ])
            .unwrap();
        let a = &fct.rows()[0];
        assert_eq!(a[bruta], Value::Decimal(d("10500")));
        assert_eq!(a[descontos], Value::Decimal(d("3100")));
        assert_eq!(a[liquida], Value::Decimal(d("7400")));
        assert_eq!(a[vinculo], Value::Text("EFETIVO".into()));
        assert_eq!(
            a[competencia],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        let b = &fct.rows()[1];
        assert_eq!(b[liquida], Value::Decimal(d("4000")));
        assert_eq!(b[vinculo], Value::Null);
    }

    #[test]
    fn test_pension_payroll_uses_pension_components() {
        let inputs = Inputs::new()
            .with(
                staged(
                    "stg_pensionistas",
                    vec![json!({"sequencial": 9, "vinculo": "PENSIONISTA", "nome_instituidor": "Instituidor"})],
                )
                .renamed("dim_pensionista"),
            )
            .with(staged(
                "stg_remuneracoes_pensionistas",
                vec![
                    json!({"sequencial": 9, "ano": 2024, "mes": 2, "tipo_folha": "Normal",
                           "remuneracao_basica": "8.000,00", "vantagens_pessoais": "1.000,00",
                           "vantagens_indenizatorias": "300,00", "imposto_renda": "1.500,00"}),
                    json!({"sequencial": 9, "mes": 2, "tipo_folha": "Normal"}),
                ],
            ));
        let fct = fct_remuneracao_pensionista(&inputs).unwrap();
        assert_eq!(fct.len(), 1);
        let [bruta, liquida, instituidor, competencia] = fct
            .cols([
                "remuneracao_bruta",
                "remuneracao_liquida",
                "nome_instituidor",
                "data_competencia",
            ])
            .unwrap();
        let row = &fct.rows()[0];
        assert_eq!(row[bruta], Value::Decimal(d("9000")));
        assert_eq!(row[liquida], Value::Decimal(d("7500")));
        assert_eq!(row[instituidor], Value::Text("Instituidor".into()));
        assert_eq!(
            row[competencia],
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_overtime_denormalizes_staff_and_dates_payment() {
        let inputs = Inputs::new()
            .with(
                staged(
                    "stg_servidores",
                    vec![json!({"sequencial": 42, "vinculo": "EFETIVO", "lotacao_sigla": "SGM"})],
                )
                .renamed("dim_servidor"),
            )
            .with(staged(
                "stg_horas_extras",
                vec![
                    json!({"sequencial": 42, "valorTotal": "750,00", "mes_ano_prestacao": "01/2024",
                           "mes_ano_pagamento": "02/2024"}),
                    json!({"sequencial": 42, "valorTotal": "80,00", "mes_ano_prestacao": "12/2023",
                           "mes_ano_pagamento": "02/2024"}),
                    json!({"sequencial": 42, "valorTotal": "1,00", "mes_ano_pagamento": "02/2024"}),
                ],
            ));
        let fct = fct_hora_extra(&inputs).unwrap();
        assert_eq!(fct.len(), 2);
        fct.check_unique_key(&OVERTIME_KEY.iter().map(|c| c.to_string()).collect::<Vec<_>>())
            .unwrap();
        let [valor, pagamento, lotacao] = fct
            .cols(["valor_total", "data_pagamento", "lotacao_sigla"])
            .unwrap();
        let row = &fct.rows()[0];
        assert_eq!(row[valor], Value::Decimal(d("750")));
        assert_eq!(
            row[pagamento],
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
        assert_eq!(row[lotacao], Value::Text("SGM".into()));
    }
}
