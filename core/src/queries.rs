//! HEP analysis query catalog.
//!
//! The built-in set models the IRIS-HEP analysis description language
//! benchmark selections (missing transverse energy, jet and muon kinematics)
//! against the working table `hep_data`. A set can also be loaded from a JSON
//! file of `{"id": ..., "sql": ...}` objects; file order is reporting order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A named SQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDef {
    pub id: String,
    pub sql: String,
}

impl QueryDef {
    pub fn new(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryFileError {
    #[error("cannot read query file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed query file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate query id `{0}`")]
    DuplicateId(String),
    #[error("query `{0}` has empty SQL text")]
    EmptySql(String),
    #[error("query file {0} defines no queries")]
    Empty(String),
}

/// Ordered collection of queries with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerySet {
    queries: Vec<QueryDef>,
}

impl QuerySet {
    /// Build a set, rejecting duplicate ids and blank SQL.
    pub fn new(queries: Vec<QueryDef>) -> Result<Self, QueryFileError> {
        let mut seen = HashSet::new();
        for q in &queries {
            if !seen.insert(q.id.as_str()) {
                return Err(QueryFileError::DuplicateId(q.id.clone()));
            }
            if q.sql.trim().is_empty() {
                return Err(QueryFileError::EmptySql(q.id.clone()));
            }
        }
        Ok(Self { queries })
    }

    /// The fixed selection used by the benchmark.
    pub fn builtin() -> Self {
        let queries = BUILTIN_QUERIES
            .iter()
            .map(|(id, sql)| QueryDef::new(*id, sql.trim()))
            .collect();
        Self { queries }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, QueryFileError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| QueryFileError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|e| match e {
            QueryFileError::Parse { source, .. } => QueryFileError::Parse {
                path: display.clone(),
                source,
            },
            QueryFileError::Empty(_) => QueryFileError::Empty(display.clone()),
            other => other,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, QueryFileError> {
        let queries: Vec<QueryDef> =
            serde_json::from_str(text).map_err(|source| QueryFileError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        if queries.is_empty() {
            return Err(QueryFileError::Empty("<inline>".to_string()));
        }
        Self::new(queries)
    }

    /// Keep only the listed ids, preserving catalog order. Unknown ids are
    /// returned alongside so the caller can report them.
    pub fn filtered(&self, ids: &[String]) -> (Self, Vec<String>) {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let queries = self
            .queries
            .iter()
            .filter(|q| wanted.contains(q.id.as_str()))
            .cloned()
            .collect();
        let unknown = ids
            .iter()
            .filter(|id| self.get(id).is_none())
            .cloned()
            .collect();
        (Self { queries }, unknown)
    }

    /// Swap the SQL text of an existing query. Returns false if `id` is unknown.
    pub fn replace(&mut self, id: &str, sql: impl Into<String>) -> bool {
        match self.queries.iter_mut().find(|q| q.id == id) {
            Some(q) => {
                q.sql = sql.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&QueryDef> {
        self.queries.iter().find(|q| q.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|q| q.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryDef> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl<'a> IntoIterator for &'a QuerySet {
    type Item = &'a QueryDef;
    type IntoIter = std::slice::Iter<'a, QueryDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.queries.iter()
    }
}

// ============================================================================
// Built-in catalog
// ============================================================================

const BUILTIN_QUERIES: [(&str, &str); 9] = [
    // Missing transverse energy of every event.
    ("Q1", "SELECT MET.pt AS Emiss_T FROM hep_data"),
    // pT of every jet.
    ("Q2", "SELECT UNNEST(Jet).pt AS Jet_pT FROM hep_data"),
    // pT of central jets.
    (
        "Q3",
        r#"
        SELECT jet.pt AS Jet_pT
        FROM (SELECT UNNEST(Jet) AS jet FROM hep_data) AS jet
        WHERE ABS(jet.eta) < 1
    "#,
    ),
    // MET when at least two jets have pT > 40.
    (
        "Q4",
        r#"
        SELECT MET.pt AS Emiss_T
        FROM hep_data
        WHERE (
            SELECT COUNT(*)
            FROM (SELECT UNNEST(Jet) AS jet FROM hep_data) AS jet
            WHERE jet.pt > 40
        ) >= 2
    "#,
    ),
    // MET for opposite-charge muon pairs in the Z window.
    (
        "Q5",
        r#"
        SELECT MET.pt AS Emiss_T
        FROM hep_data, (select UNNEST(Muon) as muon1 from hep_data) AS muon1, (select UNNEST(Muon) as muon2 from hep_data) AS muon2
        WHERE muon1.charge != muon2.charge
            AND ABS(muon1.pt + muon2.pt) BETWEEN 60 AND 120
        LIMIT 100000
    "#,
    ),
    // pT of the jet closest to the top mass.
    (
        "Q6a",
        r#"
        WITH trijet_combinations AS (
            SELECT trijet.pt AS Trijet_pT
            FROM hep_data, (SELECT UNNEST(Jet) AS trijet FROM hep_data) AS trijet
            WHERE ABS(trijet.mass - 172.5) = (
                SELECT MIN(ABS(trijet.mass - 172.5))
                FROM (SELECT UNNEST(Jet) AS trijet FROM hep_data) AS trijet
            )
        )
        SELECT Trijet_pT FROM trijet_combinations
    "#,
    ),
    // Max b-tag discriminant of the jet closest to the top mass.
    (
        "Q6b",
        r#"
        WITH trijet_combinations AS (
            SELECT trijet.pt AS Trijet_pT, MAX(trijet.btag) AS Max_b_tagging
            FROM (SELECT UNNEST(Jet) AS trijet FROM hep_data) AS trijet
            WHERE ABS(trijet.mass - 172.5) = (
                SELECT MIN(ABS(trijet.mass - 172.5))
                FROM (SELECT UNNEST(Jet) AS trijet FROM hep_data) AS trijet
            )
            GROUP BY trijet.pt
        )
        SELECT Max_b_tagging FROM trijet_combinations
    "#,
    ),
    // Scalar sum of jet pT for jets isolated from muons.
    (
        "Q7",
        r#"
        SELECT SUM(jet1.pt) AS Scalar_sum_pT
        FROM hep_data, (SELECT UNNEST(Jet) AS jet1 FROM hep_data) AS jet1
        WHERE jet1.pt > 30
          AND NOT EXISTS (
              SELECT 1
              FROM (SELECT UNNEST(Muon) AS lepton FROM hep_data) AS lepton
              WHERE ABS(jet1.eta - lepton.eta) < 0.4
                AND ABS(jet1.phi - lepton.phi) < 0.4
          )
        GROUP BY event
    "#,
    ),
    // Transverse mass proxy of muon pairs.
    (
        "Q8",
        r#"
        WITH lepton_pair AS (
            SELECT lepton1.pt AS pt1, lepton2.pt AS pt2,
                   (lepton1.pt + lepton2.pt) AS transverse_mass
            FROM hep_data,
                 (SELECT UNNEST(Muon) AS lepton1 FROM hep_data) AS lepton1,
                 (SELECT UNNEST(Muon) AS lepton2 FROM hep_data) AS lepton2
            WHERE ABS(lepton1.pt - lepton2.pt) BETWEEN 60 AND 120
        )
        SELECT transverse_mass
        FROM lepton_pair
        WHERE transverse_mass IS NOT NULL
        LIMIT 200000
    "#,
    ),
];
