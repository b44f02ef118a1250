use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{debug, warn};
use rusqlite::{params, Connection};
use trkcore::data::cluster::{Pixel, PixelCluster, StripCluster};
use trkcore::data::det_id::DetId;
use trkcore::data::event::InMemoryEvent;
use trkcore::data::rec_hit::{MatchedStripRecHit2D, PixelRecHit, RecHitKind, StripRecHit2D, TrackerRecHit};
use trkcore::data::sim_hit::{LocalPoint, SimHit};
use trkcore::simulation::digi_sim_link::{
    DigiSimLink, DigiSimLinkTable, PixelDigiSimLink, PixelLinkTable, StripDigiSimLink, StripLinkTable,
};

use crate::association::HitAssociation;
use crate::data::containers::{PixelClusterRow, RecHitRow, StoredRecHit, StripClusterRow};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sim_hits (
    event_id INTEGER NOT NULL,
    collection TEXT NOT NULL,
    det_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    entry_x REAL NOT NULL, entry_y REAL NOT NULL, entry_z REAL NOT NULL,
    exit_x REAL NOT NULL, exit_y REAL NOT NULL, exit_z REAL NOT NULL,
    p_abs REAL NOT NULL,
    tof REAL NOT NULL,
    energy_loss REAL NOT NULL,
    particle_type INTEGER NOT NULL,
    process_type INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS strip_digi_sim_links (
    event_id INTEGER NOT NULL,
    label TEXT NOT NULL,
    det_id INTEGER NOT NULL,
    channel INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    fraction REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS pixel_digi_sim_links (
    event_id INTEGER NOT NULL,
    label TEXT NOT NULL,
    det_id INTEGER NOT NULL,
    channel INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    fraction REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS strip_clusters (
    event_id INTEGER NOT NULL,
    cluster_id INTEGER NOT NULL,
    det_id INTEGER NOT NULL,
    first_strip INTEGER NOT NULL,
    amplitudes TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS pixel_clusters (
    event_id INTEGER NOT NULL,
    cluster_id INTEGER NOT NULL,
    det_id INTEGER NOT NULL,
    pixels TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS rec_hits (
    event_id INTEGER NOT NULL,
    hit_id INTEGER NOT NULL,
    kind INTEGER NOT NULL,
    det_id INTEGER NOT NULL,
    cluster_id INTEGER,
    mono_hit_id INTEGER,
    stereo_hit_id INTEGER
);
CREATE TABLE IF NOT EXISTS hit_associations (
    event_id INTEGER NOT NULL,
    hit_id INTEGER NOT NULL,
    rank INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    charge_fraction REAL
);
";

const STRIP_LINK_TABLE: &str = "strip_digi_sim_links";
const PIXEL_LINK_TABLE: &str = "pixel_digi_sim_links";

fn json_column_error(column: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Event store backed by a SQLite file.
///
/// Rows are read back in insertion order, which is the storage order the
/// associator preserves for simulated hits and links.
#[derive(Debug)]
pub struct TrackerEventDataHandle {
    pub connection: Connection,
}

impl TrackerEventDataHandle {
    pub fn new(path: &Path) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;
        Ok(Self { connection })
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Creates the event tables if they do not exist yet.
    pub fn create_schema(&self) -> rusqlite::Result<()> {
        self.connection.execute_batch(SCHEMA)
    }

    /// Ids of all events with simulated hits or rec-hits, ascending.
    pub fn read_event_ids(&self) -> rusqlite::Result<Vec<u32>> {
        let mut stmt = self.connection.prepare(
            "SELECT event_id FROM sim_hits UNION SELECT event_id FROM rec_hits ORDER BY event_id",
        )?;
        let ids: rusqlite::Result<Vec<u32>> = stmt.query_map([], |row| row.get(0))?.collect();
        ids
    }

    /// Simulated hits of one event, grouped by collection label.
    pub fn read_sim_hits(&self, event_id: u32) -> rusqlite::Result<BTreeMap<String, Vec<SimHit>>> {
        let mut stmt = self.connection.prepare(
            "SELECT collection, det_id, track_id, entry_x, entry_y, entry_z, exit_x, exit_y, exit_z, \
             p_abs, tof, energy_loss, particle_type, process_type \
             FROM sim_hits WHERE event_id = ?1 ORDER BY rowid",
        )?;
        let hits_iter = stmt.query_map(params![event_id], |row| {
            let collection: String = row.get(0)?;
            let hit = SimHit {
                det_unit_id: DetId::new(row.get(1)?),
                track_id: row.get(2)?,
                entry_point: LocalPoint::new(
                    row.get::<_, f64>(3)? as f32,
                    row.get::<_, f64>(4)? as f32,
                    row.get::<_, f64>(5)? as f32,
                ),
                exit_point: LocalPoint::new(
                    row.get::<_, f64>(6)? as f32,
                    row.get::<_, f64>(7)? as f32,
                    row.get::<_, f64>(8)? as f32,
                ),
                p_abs: row.get::<_, f64>(9)? as f32,
                tof: row.get::<_, f64>(10)? as f32,
                energy_loss: row.get::<_, f64>(11)? as f32,
                particle_type: row.get(12)?,
                process_type: row.get(13)?,
            };
            Ok((collection, hit))
        })?;

        let mut hits: BTreeMap<String, Vec<SimHit>> = BTreeMap::new();
        for entry in hits_iter {
            let (collection, hit) = entry?;
            hits.entry(collection).or_insert_with(Vec::new).push(hit);
        }
        Ok(hits)
    }

    pub fn read_strip_links(&self, event_id: u32) -> rusqlite::Result<BTreeMap<String, StripLinkTable>> {
        self.read_links(STRIP_LINK_TABLE, event_id, StripDigiSimLink::new)
    }

    pub fn read_pixel_links(&self, event_id: u32) -> rusqlite::Result<BTreeMap<String, PixelLinkTable>> {
        self.read_links(PIXEL_LINK_TABLE, event_id, PixelDigiSimLink::new)
    }

    fn read_links<L>(
        &self,
        table: &str,
        event_id: u32,
        make_link: fn(u32, u32, f32) -> L,
    ) -> rusqlite::Result<BTreeMap<String, DigiSimLinkTable<L>>> {
        let query = format!(
            "SELECT label, det_id, channel, track_id, fraction FROM {} WHERE event_id = ?1 ORDER BY rowid",
            table
        );
        let mut stmt = self.connection.prepare(&query)?;
        let links_iter = stmt.query_map(params![event_id], |row| {
            let label: String = row.get(0)?;
            let det_id = DetId::new(row.get(1)?);
            let link = make_link(row.get(2)?, row.get(3)?, row.get::<_, f64>(4)? as f32);
            Ok((label, det_id, link))
        })?;

        let mut tables: BTreeMap<String, DigiSimLinkTable<L>> = BTreeMap::new();
        for entry in links_iter {
            let (label, det_id, link) = entry?;
            tables.entry(label).or_insert_with(DigiSimLinkTable::new).push(det_id, link);
        }
        Ok(tables)
    }

    pub fn read_strip_clusters(&self, event_id: u32) -> rusqlite::Result<Vec<StripClusterRow>> {
        let mut stmt = self.connection.prepare(
            "SELECT cluster_id, det_id, first_strip, amplitudes FROM strip_clusters \
             WHERE event_id = ?1 ORDER BY rowid",
        )?;
        let clusters_iter = stmt.query_map(params![event_id], |row| {
            let amplitudes_str: String = row.get(3)?;
            let amplitudes: Vec<u16> = match serde_json::from_str(&amplitudes_str) {
                Ok(value) => value,
                Err(e) => return Err(json_column_error(3, e)),
            };
            Ok(StripClusterRow {
                cluster_id: row.get(0)?,
                det_id: DetId::new(row.get(1)?),
                cluster: StripCluster::new(row.get(2)?, amplitudes),
            })
        })?;
        let mut clusters = Vec::new();
        for cluster in clusters_iter {
            clusters.push(cluster?);
        }
        Ok(clusters)
    }

    pub fn read_pixel_clusters(&self, event_id: u32) -> rusqlite::Result<Vec<PixelClusterRow>> {
        let mut stmt = self.connection.prepare(
            "SELECT cluster_id, det_id, pixels FROM pixel_clusters WHERE event_id = ?1 ORDER BY rowid",
        )?;
        let clusters_iter = stmt.query_map(params![event_id], |row| {
            let pixels_str: String = row.get(2)?;
            let pixels: Vec<Pixel> = match serde_json::from_str(&pixels_str) {
                Ok(value) => value,
                Err(e) => return Err(json_column_error(2, e)),
            };
            Ok(PixelClusterRow {
                cluster_id: row.get(0)?,
                det_id: DetId::new(row.get(1)?),
                cluster: PixelCluster::new(pixels),
            })
        })?;
        let mut clusters = Vec::new();
        for cluster in clusters_iter {
            clusters.push(cluster?);
        }
        Ok(clusters)
    }

    pub fn read_rec_hit_rows(&self, event_id: u32) -> rusqlite::Result<Vec<RecHitRow>> {
        let mut stmt = self.connection.prepare(
            "SELECT hit_id, kind, det_id, cluster_id, mono_hit_id, stereo_hit_id FROM rec_hits \
             WHERE event_id = ?1 ORDER BY rowid",
        )?;
        let rows: rusqlite::Result<Vec<RecHitRow>> = stmt
            .query_map(params![event_id], |row| {
                Ok(RecHitRow {
                    hit_id: row.get(0)?,
                    kind: RecHitKind::new(row.get(1)?),
                    det_id: DetId::new(row.get(2)?),
                    cluster_id: row.get(3)?,
                    mono_hit_id: row.get(4)?,
                    stereo_hit_id: row.get(5)?,
                })
            })?
            .collect();
        rows
    }

    /// Rec-hits of one event with their clusters resolved.
    ///
    /// Hits whose cluster or constituent hits are missing are skipped.
    pub fn read_rec_hits(&self, event_id: u32) -> rusqlite::Result<Vec<StoredRecHit>> {
        let rows = self.read_rec_hit_rows(event_id)?;
        let strip_clusters: HashMap<i64, StripCluster> = self
            .read_strip_clusters(event_id)?
            .into_iter()
            .map(|c| (c.cluster_id, c.cluster))
            .collect();
        let pixel_clusters: HashMap<i64, PixelCluster> = self
            .read_pixel_clusters(event_id)?
            .into_iter()
            .map(|c| (c.cluster_id, c.cluster))
            .collect();

        // simple strip hits first, matched hits refer to them
        let strip_hits: HashMap<i64, StripRecHit2D> = rows
            .iter()
            .filter(|row| row.kind == RecHitKind::SimpleStrip)
            .filter_map(|row| {
                let cluster = strip_clusters.get(&row.cluster_id?)?;
                Some((row.hit_id, StripRecHit2D::new(row.det_id, cluster.clone())))
            })
            .collect();

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let hit = match row.kind {
                RecHitKind::SimpleStrip => {
                    strip_hits.get(&row.hit_id).cloned().map(TrackerRecHit::SimpleStrip)
                }
                RecHitKind::MatchedStrip => {
                    let mono = row.mono_hit_id.and_then(|id| strip_hits.get(&id));
                    let stereo = row.stereo_hit_id.and_then(|id| strip_hits.get(&id));
                    match (mono, stereo) {
                        (Some(mono), Some(stereo)) => Some(TrackerRecHit::MatchedStrip(
                            MatchedStripRecHit2D::new(row.det_id, mono.clone(), stereo.clone()),
                        )),
                        _ => None,
                    }
                }
                RecHitKind::Pixel => row
                    .cluster_id
                    .and_then(|id| pixel_clusters.get(&id))
                    .map(|cluster| TrackerRecHit::Pixel(PixelRecHit::new(row.det_id, cluster.clone()))),
                RecHitKind::Other => Some(TrackerRecHit::Other { det_id: row.det_id }),
            };

            match hit {
                Some(hit) => hits.push(StoredRecHit { hit_id: row.hit_id, hit }),
                None => warn!(
                    "event {}: rec-hit {} ({}) references a missing cluster or hit, skipped",
                    event_id, row.hit_id, row.kind
                ),
            }
        }
        Ok(hits)
    }

    /// Loads the simulated hits and digi-sim links of one event.
    pub fn load_event(&self, event_id: u32) -> rusqlite::Result<InMemoryEvent> {
        let event = InMemoryEvent {
            event_id,
            sim_hits: self.read_sim_hits(event_id)?,
            strip_links: self.read_strip_links(event_id)?,
            pixel_links: self.read_pixel_links(event_id)?,
        };
        debug!(
            "loaded event {}: {} sim-hit collections, {} strip and {} pixel link products",
            event_id,
            event.sim_hits.len(),
            event.strip_links.len(),
            event.pixel_links.len()
        );
        Ok(event)
    }

    /// Writes the simulated hits and digi-sim links of `event`.
    pub fn store_event(&self, event: &InMemoryEvent) -> rusqlite::Result<()> {
        let tx = self.connection.unchecked_transaction()?;
        for (label, hits) in &event.sim_hits {
            for hit in hits {
                tx.execute(
                    "INSERT INTO sim_hits (event_id, collection, det_id, track_id, entry_x, entry_y, entry_z, \
                     exit_x, exit_y, exit_z, p_abs, tof, energy_loss, particle_type, process_type) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        event.event_id,
                        label,
                        hit.det_unit_id.raw(),
                        hit.track_id,
                        hit.entry_point.x as f64,
                        hit.entry_point.y as f64,
                        hit.entry_point.z as f64,
                        hit.exit_point.x as f64,
                        hit.exit_point.y as f64,
                        hit.exit_point.z as f64,
                        hit.p_abs as f64,
                        hit.tof as f64,
                        hit.energy_loss as f64,
                        hit.particle_type,
                        hit.process_type,
                    ],
                )?;
            }
        }
        for (label, table) in &event.strip_links {
            insert_links(&tx, STRIP_LINK_TABLE, event.event_id, label, table)?;
        }
        for (label, table) in &event.pixel_links {
            insert_links(&tx, PIXEL_LINK_TABLE, event.event_id, label, table)?;
        }
        tx.commit()
    }

    pub fn insert_strip_cluster(&self, event_id: u32, row: &StripClusterRow) -> rusqlite::Result<usize> {
        let amplitudes = serde_json::to_string(&row.cluster.amplitudes)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.connection.execute(
            "INSERT INTO strip_clusters (event_id, cluster_id, det_id, first_strip, amplitudes) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![event_id, row.cluster_id, row.det_id.raw(), row.cluster.first_strip, amplitudes],
        )
    }

    pub fn insert_pixel_cluster(&self, event_id: u32, row: &PixelClusterRow) -> rusqlite::Result<usize> {
        let pixels = serde_json::to_string(&row.cluster.pixels)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.connection.execute(
            "INSERT INTO pixel_clusters (event_id, cluster_id, det_id, pixels) VALUES (?1, ?2, ?3, ?4)",
            params![event_id, row.cluster_id, row.det_id.raw(), pixels],
        )
    }

    pub fn insert_rec_hit(&self, event_id: u32, row: &RecHitRow) -> rusqlite::Result<usize> {
        self.connection.execute(
            "INSERT INTO rec_hits (event_id, hit_id, kind, det_id, cluster_id, mono_hit_id, stereo_hit_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event_id,
                row.hit_id,
                row.kind.code(),
                row.det_id.raw(),
                row.cluster_id,
                row.mono_hit_id,
                row.stereo_hit_id,
            ],
        )
    }

    /// Replaces the stored associations of one event, one row per
    /// (hit, track) in association order.
    pub fn write_associations(&self, event_id: u32, associations: &[HitAssociation]) -> rusqlite::Result<usize> {
        let tx = self.connection.unchecked_transaction()?;
        tx.execute("DELETE FROM hit_associations WHERE event_id = ?1", params![event_id])?;
        let mut written = 0;
        for association in associations {
            for (rank, (track_id, fraction)) in association
                .track_ids
                .iter()
                .zip(association.charge_fractions.iter())
                .enumerate()
            {
                written += tx.execute(
                    "INSERT INTO hit_associations (event_id, hit_id, rank, track_id, charge_fraction) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![event_id, association.hit_id, rank as i64, track_id, fraction.map(|f| f as f64)],
                )?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Stored associations of one event as `(hit_id, track_id)` in rank order.
    pub fn read_associations(&self, event_id: u32) -> rusqlite::Result<Vec<(i64, u32)>> {
        let mut stmt = self.connection.prepare(
            "SELECT hit_id, track_id FROM hit_associations WHERE event_id = ?1 ORDER BY hit_id, rank",
        )?;
        let rows: rusqlite::Result<Vec<(i64, u32)>> =
            stmt.query_map(params![event_id], |row| Ok((row.get(0)?, row.get(1)?)))?.collect();
        rows
    }
}

fn insert_links<L: DigiSimLink>(
    connection: &Connection,
    table: &str,
    event_id: u32,
    label: &str,
    links: &DigiSimLinkTable<L>,
) -> rusqlite::Result<()> {
    let query = format!(
        "INSERT INTO {} (event_id, label, det_id, channel, track_id, fraction) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        table
    );
    let mut stmt = connection.prepare(&query)?;
    for (det_id, module_links) in links.iter() {
        for link in module_links {
            stmt.execute(params![
                event_id,
                label,
                det_id.raw(),
                link.channel(),
                link.sim_track_id(),
                link.fraction() as f64,
            ])?;
        }
    }
    Ok(())
}
