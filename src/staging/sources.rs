//! Adapter catalogue: one entry per raw source domain.

use warehouse_core::{Row, Schema, Value};

use super::CastKind::{self, BrDecimal, Boolean, Date, Integer, Text};
use super::{ColumnCast, StagingAdapter};

fn c(target: &'static str, cast: CastKind) -> ColumnCast {
    ColumnCast::new(target, cast)
}

pub fn adapters() -> Vec<StagingAdapter> {
    vec![
        senadores(),
        deputados(),
        servidores(),
        remuneracoes(),
        pensionistas(),
        remuneracoes_pensionistas(),
        horas_extras(),
        ceaps(),
        votacoes(),
        votos(),
        emendas_documentos(),
    ]
}

pub fn adapter_for_table(table: &str) -> Option<StagingAdapter> {
    adapters().into_iter().find(|a| a.table == table)
}

fn senadores() -> StagingAdapter {
    StagingAdapter {
        source: "senadores",
        table: "stg_senadores",
        columns: vec![
            c("senador_id", Text),
            c("nome_parlamentar", Text),
            c("nome_completo", Text),
            c("sexo", Text),
            c("partido_sigla", Text),
            c("estado_sigla", Text),
            c("email", Text),
            c("data_nascimento", Date),
            c("foto_url", Text),
            c("pagina_url", Text),
            // the listing is per mandate: a re-elected senator appears twice
            c("mandato_inicio", Date).or("data_inicio"),
            c("mandato_fim", Date).or("data_fim"),
            c("descricao_participacao", Text),
            c("em_exercicio", Boolean),
        ],
        derive: None,
    }
}

fn deputados() -> StagingAdapter {
    StagingAdapter {
        source: "camara_deputados",
        table: "stg_deputados",
        columns: vec![
            c("deputado_id", Text),
            // list extracts carry `nome`, detail extracts `nome_parlamentar`
            c("nome_parlamentar", Text).or("nome"),
            c("nome_civil", Text),
            c("sigla_partido", Text),
            c("sigla_uf", Text),
            c("id_legislatura", Integer),
            c("situacao", Text),
            c("email", Text),
        ],
        derive: None,
    }
}

fn servidores() -> StagingAdapter {
    StagingAdapter {
        source: "servidores",
        table: "stg_servidores",
        columns: vec![
            c("sequencial", Integer),
            c("nome", Text),
            c("vinculo", Text),
            c("situacao", Text),
            c("cargo_nome", Text),
            c("funcao_nome", Text),
            c("lotacao_sigla", Text),
            c("lotacao_nome", Text),
            c("ano_admissao", Integer),
        ],
        derive: None,
    }
}

fn remuneracoes() -> StagingAdapter {
    StagingAdapter {
        source: "remuneracoes",
        table: "stg_remuneracoes",
        columns: vec![
            c("sequencial", Integer),
            c("nome", Text),
            c("ano", Integer),
            c("mes", Integer),
            c("tipo_folha", Text),
            c("remuneracao_basica", BrDecimal),
            c("vantagens_pessoais", BrDecimal),
            c("funcao_comissionada", BrDecimal),
            c("gratificacao_natalina", BrDecimal),
            c("horas_extras", BrDecimal),
            c("outras_eventuais", BrDecimal),
            c("abono_permanencia", BrDecimal),
            c("diarias", BrDecimal),
            c("auxilios", BrDecimal),
            c("vantagens_indenizatorias", BrDecimal),
            c("faltas", BrDecimal),
            c("previdencia", BrDecimal),
            c("reversao_teto_constitucional", BrDecimal),
            c("imposto_renda", BrDecimal),
            c("remuneracao_liquida", BrDecimal),
        ],
        derive: None,
    }
}

fn pensionistas() -> StagingAdapter {
    StagingAdapter {
        source: "pensionistas",
        table: "stg_pensionistas",
        columns: vec![
            c("sequencial", Integer),
            c("nome", Text),
            c("vinculo", Text),
            c("fundamento", Text),
            c("cargo_nome", Text),
            c("funcao_nome", Text),
            c("categoria_codigo", Text),
            c("categoria_nome", Text),
            c("nome_instituidor", Text),
            c("ano_exercicio", Integer),
            c("data_obito", Date),
            c("data_inicio_pensao", Date),
        ],
        derive: None,
    }
}

fn remuneracoes_pensionistas() -> StagingAdapter {
    StagingAdapter {
        source: "remuneracoes_pensionistas",
        table: "stg_remuneracoes_pensionistas",
        columns: vec![
            c("sequencial", Integer),
            c("nome", Text),
            c("ano", Integer),
            c("mes", Integer),
            c("tipo_folha", Text),
            c("remuneracao_basica", BrDecimal),
            c("vantagens_pessoais", BrDecimal),
            c("funcao_comissionada", BrDecimal),
            c("gratificacao_natalina", BrDecimal),
            c("vantagens_indenizatorias", BrDecimal),
            c("previdencia", BrDecimal),
            c("reversao_teto_constitucional", BrDecimal),
            c("imposto_renda", BrDecimal),
            c("remuneracao_liquida", BrDecimal),
        ],
        derive: None,
    }
}

fn horas_extras() -> StagingAdapter {
    StagingAdapter {
        source: "horas_extras",
        table: "stg_horas_extras",
        columns: vec![
            c("sequencial", Integer),
            c("nome", Text),
            c("valor_total", BrDecimal).or("valorTotal"),
            c("mes_ano_prestacao", Text),
            c("mes_ano_pagamento", Text),
            c("ano_pagamento", Integer),
            c("mes_pagamento", Integer),
        ],
        derive: Some(derive_payment_period),
    }
}

fn ceaps() -> StagingAdapter {
    StagingAdapter {
        source: "ceaps",
        table: "stg_ceaps",
        columns: vec![
            c("id", Integer),
            c("ano", Integer),
            c("mes", Integer),
            // integer in the API, kept as text to join senator ids
            c("cod_senador", Text).or("codSenador"),
            c("nome_senador", Text),
            c("tipo_despesa", Text),
            c("tipo_documento", Text),
            c("cnpj_cpf", Text),
            c("fornecedor", Text),
            c("documento", Text),
            c("data", Date),
            c("detalhamento", Text),
            c("valor_reembolsado", BrDecimal),
        ],
        derive: None,
    }
}

fn votacoes() -> StagingAdapter {
    StagingAdapter {
        source: "votacoes",
        table: "stg_votacoes",
        columns: vec![
            c("codigo_sessao_votacao", Integer),
            c("codigo_materia", Integer),
            c("sigla_materia", Text),
            c("numero_materia", Text),
            c("ano_materia", Integer),
            c("data_sessao", Date),
            c("descricao_votacao", Text),
            c("resultado_votacao", Text),
            c("votacao_secreta", Boolean),
            c("total_votos_sim", Integer),
            c("total_votos_nao", Integer),
            c("total_votos_abstencao", Integer),
        ],
        derive: None,
    }
}

fn votos() -> StagingAdapter {
    StagingAdapter {
        source: "votos",
        table: "stg_votos",
        columns: vec![
            c("codigo_sessao_votacao", Integer),
            c("codigo_parlamentar", Integer),
            c("nome_parlamentar", Text),
            c("sigla_partido", Text),
            c("sigla_uf", Text),
            c("sigla_voto", Text),
            c("descricao_voto", Text),
        ],
        derive: None,
    }
}

fn emendas_documentos() -> StagingAdapter {
    StagingAdapter {
        source: "emendas_documentos",
        table: "stg_emendas_documentos",
        columns: vec![
            c("codigo_emenda", Text),
            c("ano_emenda", Integer),
            c("tipo_emenda", Text),
            c("codigo_autor_emenda", Text),
            c("nome_autor_emenda", Text),
            c("numero_emenda", Text),
            c("codigo_documento", Text),
            c("data_documento", Date),
            c("fase_despesa", Text),
            c("valor_empenhado", BrDecimal),
            c("valor_pago", BrDecimal),
            c("localidade_recurso", Text),
            c("uf_recurso", Text),
            c("municipio_recurso", Text),
            c("codigo_ibge_municipio", Text),
            c("codigo_favorecido", Text),
            c("favorecido", Text),
            c("tipo_favorecido", Text),
            c("orgao", Text),
            c("funcao", Text),
            c("programa", Text),
            c("acao", Text),
        ],
        derive: Some(derive_amendment_code),
    }
}

/// Amendment codes are `YYYY` + author code (4) + sequence (4). Fill a
/// missing year or author code from the code itself.
pub fn derive_amendment_code(schema: &Schema, row: &mut Row) {
    let (Some(code), Some(ano), Some(autor)) = (
        schema.index_of("codigo_emenda"),
        schema.index_of("ano_emenda"),
        schema.index_of("codigo_autor_emenda"),
    ) else {
        return;
    };
    let Some(chars) = row[code].as_text().map(|s| s.chars().collect::<Vec<_>>()) else {
        return;
    };

    if row[ano].is_null() && chars.len() >= 4 {
        let prefix: String = chars[..4].iter().collect();
        if let Ok(year) = prefix.parse::<i64>() {
            row[ano] = Value::Int(year);
        }
    }
    if row[autor].is_null() && chars.len() >= 8 {
        row[autor] = Value::Text(chars[4..8].iter().collect());
    }
}

/// Overtime extracts label months as `MM/YYYY`. Fill a missing payment
/// year or month from `mes_ano_pagamento`.
pub fn derive_payment_period(schema: &Schema, row: &mut Row) {
    let (Some(label), Some(ano), Some(mes)) = (
        schema.index_of("mes_ano_pagamento"),
        schema.index_of("ano_pagamento"),
        schema.index_of("mes_pagamento"),
    ) else {
        return;
    };
    let Some((month, year)) = row[label].as_text().and_then(month_year) else {
        return;
    };
    if row[ano].is_null() {
        row[ano] = Value::Int(year);
    }
    if row[mes].is_null() {
        row[mes] = Value::Int(month);
    }
}

fn month_year(label: &str) -> Option<(i64, i64)> {
    let (month, year) = label.trim().split_once('/')?;
    let month: i64 = month.parse().ok()?;
    let year: i64 = year.parse().ok()?;
    (1..=12).contains(&month).then_some((month, year))
}
