//! Amendment authorship resolution.
//!
//! ```text
//!   stg_emendas_documentos ──► representative per codigo_emenda
//!        │                      (data_documento desc, codigo_documento desc)
//!        ▼
//!   tipo_emenda contains "Individual"? ── no ──► unresolved
//!        │ yes
//!        ▼
//!   normalize(nome_autor) ∈ dim_senador ── yes ──► senator
//!        │ no
//!        ▼
//!   normalize(nome_autor) ∈ dim_deputado ── yes ──► deputy
//!        │ no
//!        ▼
//!   unresolved
//! ```
//!
//! Dimensions only hold current office-holders, so amendments by former
//! legislators stay unresolved.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{info, warn};
use warehouse_core::{ColumnType, Relation, Row, Schema, Value};

use super::normalize::normalize_name;
use super::representative::{select_representatives, Precedence};
use crate::error::Result;

pub const INDIVIDUAL_MARKER: &str = "Individual";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legislator {
    pub id: String,
    pub nome: Option<String>,
    pub partido: Option<String>,
    pub uf: Option<String>,
}

/// Column names of a legislator dimension.
#[derive(Debug, Clone, Copy)]
pub struct DimensionColumns {
    pub id: &'static str,
    pub normalized_name: &'static str,
    pub nome: &'static str,
    pub partido: &'static str,
    pub uf: &'static str,
}

impl DimensionColumns {
    pub const SENATOR: Self = Self {
        id: "senador_id",
        normalized_name: "nome_normalizado",
        nome: "nome_parlamentar",
        partido: "partido_sigla",
        uf: "estado_sigla",
    };

    pub const DEPUTY: Self = Self {
        id: "deputado_id",
        normalized_name: "nome_normalizado",
        nome: "nome_parlamentar",
        partido: "partido_sigla",
        uf: "estado_sigla",
    };
}

/// Numeric ids by value, then anything else by text.
fn id_rank(id: &str) -> (bool, i64, &str) {
    match id.parse::<i64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

/// Normalized name to candidate legislators.
#[derive(Debug, Clone, Default)]
pub struct LegislatorIndex {
    by_name: HashMap<String, SmallVec<[Legislator; 2]>>,
}

impl LegislatorIndex {
    pub fn from_dimension(dim: &Relation, cols: DimensionColumns) -> Result<Self> {
        let [id, key, nome, partido, uf] =
            dim.cols([cols.id, cols.normalized_name, cols.nome, cols.partido, cols.uf])?;
        let text = |v: &Value| v.as_text().map(str::to_string);

        let mut index = Self::default();
        for row in dim.rows() {
            let (Some(legislator_id), Some(name_key)) = (text(&row[id]), row[key].as_text())
            else {
                continue;
            };
            index.insert(
                name_key,
                Legislator {
                    id: legislator_id,
                    nome: text(&row[nome]),
                    partido: text(&row[partido]),
                    uf: text(&row[uf]),
                },
            );
        }

        let collisions = index.by_name.values().filter(|c| c.len() > 1).count();
        if collisions > 0 {
            warn!(
                table = dim.name(),
                collisions, "legislators sharing a normalized name; lowest id wins"
            );
        }
        Ok(index)
    }

    /// Empty keys are never indexed, so a blank name never matches.
    pub fn insert(&mut self, normalized: &str, legislator: Legislator) {
        if normalized.is_empty() {
            return;
        }
        self.by_name
            .entry(normalized.to_string())
            .or_default()
            .push(legislator);
    }

    pub fn candidates(&self, normalized: &str) -> &[Legislator] {
        self.by_name
            .get(normalized)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// The single match for a name; collisions resolve to the lowest id.
    pub fn lookup(&self, normalized: &str) -> Option<&Legislator> {
        self.candidates(normalized)
            .iter()
            .min_by(|a, b| id_rank(&a.id).cmp(&id_rank(&b.id)))
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorship<'a> {
    Senator(&'a Legislator),
    Deputy(&'a Legislator),
    Unresolved,
}

impl<'a> Authorship<'a> {
    pub fn senator(&self) -> Option<&'a Legislator> {
        match self {
            Authorship::Senator(l) => Some(l),
            _ => None,
        }
    }

    pub fn deputy(&self) -> Option<&'a Legislator> {
        match self {
            Authorship::Deputy(l) => Some(l),
            _ => None,
        }
    }
}

pub struct EntityResolver {
    senators: LegislatorIndex,
    deputies: LegislatorIndex,
}

impl EntityResolver {
    pub fn new(senators: LegislatorIndex, deputies: LegislatorIndex) -> Self {
        Self { senators, deputies }
    }

    pub fn from_dimensions(dim_senador: &Relation, dim_deputado: &Relation) -> Result<Self> {
        Ok(Self::new(
            LegislatorIndex::from_dimension(dim_senador, DimensionColumns::SENATOR)?,
            LegislatorIndex::from_dimension(dim_deputado, DimensionColumns::DEPUTY)?,
        ))
    }

    /// Only individual amendments have a person as author.
    pub fn is_individual(tipo_emenda: Option<&str>) -> bool {
        tipo_emenda.is_some_and(|t| t.contains(INDIVIDUAL_MARKER))
    }

    /// Senator first; the deputy index is consulted only on a senator miss.
    pub fn resolve(&self, tipo_emenda: Option<&str>, autor: Option<&str>) -> Authorship<'_> {
        if !Self::is_individual(tipo_emenda) {
            return Authorship::Unresolved;
        }
        let key = normalize_name(autor);
        if let Some(s) = self.senators.lookup(&key) {
            return Authorship::Senator(s);
        }
        if let Some(d) = self.deputies.lookup(&key) {
            return Authorship::Deputy(d);
        }
        Authorship::Unresolved
    }

    pub fn dim_emenda_schema() -> Schema {
        Schema::from_pairs(&[
            ("codigo_emenda", ColumnType::Text),
            ("ano_emenda", ColumnType::Integer),
            ("tipo_emenda", ColumnType::Text),
            ("codigo_autor_emenda", ColumnType::Text),
            ("nome_autor_emenda", ColumnType::Text),
            ("nome_autor_normalizado", ColumnType::Text),
            ("numero_emenda", ColumnType::Text),
            ("senador_id", ColumnType::Text),
            ("senador_nome", ColumnType::Text),
            ("senador_partido", ColumnType::Text),
            ("senador_uf", ColumnType::Text),
            ("is_senador_atual", ColumnType::Boolean),
            ("deputado_id", ColumnType::Text),
            ("deputado_nome", ColumnType::Text),
            ("deputado_partido", ColumnType::Text),
            ("deputado_uf", ColumnType::Text),
            ("is_deputado_atual", ColumnType::Boolean),
            ("partido_sigla", ColumnType::Text),
            ("estado_sigla", ColumnType::Text),
        ])
    }

    /// Build `dim_emenda`: one row per amendment code in `documents`.
    pub fn resolve_amendments(&self, documents: &Relation) -> Result<Relation> {
        let representatives = select_representatives(
            documents,
            "codigo_emenda",
            &Precedence::latest_first(&["data_documento", "codigo_documento"]),
        )?;
        let [code, ano, tipo, cod_autor, autor, numero] = representatives.cols([
            "codigo_emenda",
            "ano_emenda",
            "tipo_emenda",
            "codigo_autor_emenda",
            "nome_autor_emenda",
            "numero_emenda",
        ])?;

        let mut out = Relation::new("dim_emenda", Self::dim_emenda_schema());
        let (mut senators, mut deputies) = (0usize, 0usize);
        for row in representatives.rows() {
            let author = row[autor].as_text();
            let resolved = self.resolve(row[tipo].as_text(), author);
            match resolved {
                Authorship::Senator(_) => senators += 1,
                Authorship::Deputy(_) => deputies += 1,
                Authorship::Unresolved => {}
            }

            let mut next: Row = vec![
                row[code].clone(),
                row[ano].clone(),
                row[tipo].clone(),
                row[cod_autor].clone(),
                row[autor].clone(),
                Value::Text(normalize_name(author)),
                row[numero].clone(),
            ];
            next.extend(legislator_columns(resolved.senator()));
            next.extend(legislator_columns(resolved.deputy()));
            let picked = resolved.senator().or(resolved.deputy());
            next.push(Value::from(picked.and_then(|l| l.partido.clone())));
            next.push(Value::from(picked.and_then(|l| l.uf.clone())));
            out.push(next)?;
        }

        info!(
            amendments = out.len(),
            senators,
            deputies,
            unresolved = out.len() - senators - deputies,
            "amendment authorship resolved"
        );
        Ok(out)
    }
}

/// id, name, party, state, is-current flag.
fn legislator_columns(l: Option<&Legislator>) -> [Value; 5] {
    match l {
        Some(l) => [
            Value::Text(l.id.clone()),
            Value::from(l.nome.clone()),
            Value::from(l.partido.clone()),
            Value::from(l.uf.clone()),
            Value::Bool(true),
        ],
        None => [
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Bool(false),
        ],
    }
}
