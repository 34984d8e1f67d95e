//! Synthetic event datasets shaped like CMS NanoAOD open data.
//!
//! Each event carries run/lumi/event ids, a `MET` struct and variable-length
//! `Jet` and `Muon` lists of structs, which is everything the built-in queries
//! touch. Generation is seeded so the same parameters always produce the same
//! file.
//!
//! Rows are staged in flat tables through DuckDB appenders and then nested and
//! written with a single `COPY ... (FORMAT PARQUET)`.

use crate::engine::{quote_literal, EngineError};
use duckdb::{params, Connection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::Path;

pub const DEFAULT_SEED: u64 = 0xC0FF_EE20_12B0_0001;

const MUON_MASS: f64 = 0.105_66;
const JET_TYPE: &str =
    "STRUCT(pt DOUBLE, eta DOUBLE, phi DOUBLE, mass DOUBLE, btag DOUBLE, puId BOOLEAN)[]";
const MUON_TYPE: &str = "STRUCT(pt DOUBLE, eta DOUBLE, phi DOUBLE, mass DOUBLE, charge INTEGER, pfRelIso03_all DOUBLE, tightId BOOLEAN)[]";

#[derive(Debug, Clone, Copy)]
pub struct SyntheticParams {
    pub events: usize,
    pub seed: u64,
    /// Upper bound (inclusive) on jets per event.
    pub max_jets: usize,
    /// Upper bound (inclusive) on muons per event.
    pub max_muons: usize,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            events: 1000,
            seed: DEFAULT_SEED,
            max_jets: 8,
            max_muons: 4,
        }
    }
}

impl SyntheticParams {
    pub fn with_events(events: usize) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }
}

struct Jet {
    pt: f64,
    eta: f64,
    phi: f64,
    mass: f64,
    btag: f64,
    pu_id: bool,
}

struct Muon {
    pt: f64,
    eta: f64,
    phi: f64,
    charge: i32,
    iso: f64,
    tight: bool,
}

/// Exponential sample with the given mean.
fn exponential(rng: &mut StdRng, mean: f64) -> f64 {
    -mean * (1.0 - rng.gen::<f64>()).ln()
}

fn random_jet(rng: &mut StdRng) -> Jet {
    // A fifth of the jets sit near the top mass so the trijet selections have
    // something to find.
    let mass = if rng.gen_bool(0.2) {
        rng.gen_range(150.0..195.0)
    } else {
        2.0 + exponential(rng, 12.0)
    };
    Jet {
        pt: 15.0 + exponential(rng, 35.0),
        eta: rng.gen_range(-4.7..4.7),
        phi: rng.gen_range(-PI..PI),
        mass,
        btag: rng.gen::<f64>(),
        pu_id: rng.gen_bool(0.8),
    }
}

fn random_muon(rng: &mut StdRng) -> Muon {
    Muon {
        pt: 3.0 + exponential(rng, 25.0),
        eta: rng.gen_range(-2.4..2.4),
        phi: rng.gen_range(-PI..PI),
        charge: if rng.gen_bool(0.5) { 1 } else { -1 },
        iso: rng.gen_range(0.0..0.5),
        tight: rng.gen_bool(0.7),
    }
}

fn create_staging_tables(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(
        "CREATE OR REPLACE TABLE synth_events (
             run INTEGER, luminosityBlock INTEGER, event BIGINT,
             met_pt DOUBLE, met_phi DOUBLE, met_sumet DOUBLE);
         CREATE OR REPLACE TABLE synth_jets (
             event BIGINT, idx INTEGER,
             pt DOUBLE, eta DOUBLE, phi DOUBLE, mass DOUBLE, btag DOUBLE, puId BOOLEAN);
         CREATE OR REPLACE TABLE synth_muons (
             event BIGINT, idx INTEGER,
             pt DOUBLE, eta DOUBLE, phi DOUBLE, mass DOUBLE, charge INTEGER,
             pfRelIso03_all DOUBLE, tightId BOOLEAN);",
    )?;
    Ok(())
}

fn drop_staging_tables(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS synth_events;
         DROP TABLE IF EXISTS synth_jets;
         DROP TABLE IF EXISTS synth_muons;",
    )?;
    Ok(())
}

fn stage_events(conn: &Connection, params: &SyntheticParams) -> Result<(), EngineError> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut events = conn.appender("synth_events")?;
    let mut jets = conn.appender("synth_jets")?;
    let mut muons = conn.appender("synth_muons")?;

    let run: i32 = 194_050;
    for n in 0..params.events {
        let event = n as i64 + 1;
        let lumi = (n / 500) as i32 + 1;
        let met_pt = exponential(&mut rng, 30.0);
        let met_phi = rng.gen_range(-PI..PI);
        let met_sumet = met_pt + rng.gen_range(100.0..1500.0);
        events.append_row(params![run, lumi, event, met_pt, met_phi, met_sumet])?;

        // NanoAOD collections are ordered by descending pT.
        let mut event_jets: Vec<Jet> = (0..rng.gen_range(0..=params.max_jets))
            .map(|_| random_jet(&mut rng))
            .collect();
        event_jets.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        for (idx, j) in event_jets.iter().enumerate() {
            jets.append_row(params![
                event, idx as i32, j.pt, j.eta, j.phi, j.mass, j.btag, j.pu_id
            ])?;
        }

        let mut event_muons: Vec<Muon> = (0..rng.gen_range(0..=params.max_muons))
            .map(|_| random_muon(&mut rng))
            .collect();
        event_muons.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        for (idx, m) in event_muons.iter().enumerate() {
            muons.append_row(params![
                event, idx as i32, m.pt, m.eta, m.phi, MUON_MASS, m.charge, m.iso, m.tight
            ])?;
        }
    }

    events.flush()?;
    jets.flush()?;
    muons.flush()?;
    Ok(())
}

fn copy_to_parquet(conn: &Connection, path: &Path) -> Result<(), EngineError> {
    let sql = format!(
        "COPY (
            SELECT e.run, e.luminosityBlock, e.event,
                   struct_pack(pt := e.met_pt, phi := e.met_phi, sumet := e.met_sumet) AS MET,
                   COALESCE(j.Jet, CAST([] AS {JET_TYPE})) AS Jet,
                   COALESCE(m.Muon, CAST([] AS {MUON_TYPE})) AS Muon
            FROM synth_events e
            LEFT JOIN (
                SELECT event,
                       list(struct_pack(pt := pt, eta := eta, phi := phi, mass := mass,
                                        btag := btag, puId := puId) ORDER BY idx) AS Jet
                FROM synth_jets GROUP BY event
            ) j ON j.event = e.event
            LEFT JOIN (
                SELECT event,
                       list(struct_pack(pt := pt, eta := eta, phi := phi, mass := mass,
                                        charge := charge, pfRelIso03_all := pfRelIso03_all,
                                        tightId := tightId) ORDER BY idx) AS Muon
                FROM synth_muons GROUP BY event
            ) m ON m.event = e.event
            ORDER BY e.event
        ) TO {} (FORMAT PARQUET)",
        quote_literal(&path.to_string_lossy())
    );
    conn.execute_batch(&sql)?;
    Ok(())
}

/// Write `params.events` synthetic events to a Parquet file at `path`.
/// Returns the number of events written.
pub fn write_dataset(
    conn: &Connection,
    path: &Path,
    params: &SyntheticParams,
) -> Result<u64, EngineError> {
    create_staging_tables(conn)?;
    let written = stage_events(conn, params).and_then(|()| copy_to_parquet(conn, path));
    let cleanup = drop_staging_tables(conn);
    written?;
    cleanup?;

    log::debug!(
        "Wrote {} synthetic events (seed {:#x}) to {}",
        params.events,
        params.seed,
        path.display()
    );
    Ok(params.events as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn written_file_has_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthetic.parquet");
        let conn = Connection::open_in_memory().unwrap();
        let params = SyntheticParams {
            events: 40,
            ..SyntheticParams::default()
        };

        assert_eq!(write_dataset(&conn, &path, &params).unwrap(), 40);

        let source = format!("read_parquet({})", quote_literal(&path.to_string_lossy()));
        assert_eq!(scalar(&conn, &format!("SELECT COUNT(*) FROM {source}")), 40);
        assert_eq!(
            scalar(&conn, &format!("SELECT COUNT(*) FROM {source} WHERE MET.pt >= 0")),
            40
        );
        let jets = scalar(&conn, &format!("SELECT COUNT(*) FROM (SELECT UNNEST(Jet) FROM {source})"));
        assert!(jets <= 40 * params.max_jets as i64);
        assert_eq!(
            scalar(&conn, &format!("SELECT COUNT(*) FROM {source} WHERE Muon IS NULL OR Jet IS NULL")),
            0,
            "empty collections are written as empty lists"
        );
        assert_eq!(
            scalar(&conn, "SELECT COUNT(*) FROM information_schema.tables WHERE table_name LIKE 'synth_%'"),
            0,
            "staging tables are dropped"
        );
    }

    #[test]
    fn same_seed_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let params = SyntheticParams::with_events(25);
        let a = dir.path().join("a.parquet");
        let b = dir.path().join("b.parquet");
        write_dataset(&conn, &a, &params).unwrap();
        write_dataset(&conn, &b, &params).unwrap();

        let diff = scalar(
            &conn,
            &format!(
                "SELECT COUNT(*) FROM (SELECT * FROM read_parquet({}) EXCEPT SELECT * FROM read_parquet({}))",
                quote_literal(&a.to_string_lossy()),
                quote_literal(&b.to_string_lossy())
            ),
        );
        assert_eq!(diff, 0);
    }
}
