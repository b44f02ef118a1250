use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use trkcore::algorithm::association::{AssociatedHit, TrackerHitAssociator};
use trkcore::algorithm::config::AssociatorConfig;
use trkcore::data::event::InMemoryEvent;
use trkcore::data::rec_hit::{RecHitKind, TrackerRecHit};

use crate::data::containers::StoredRecHit;
use crate::data::handle::TrackerEventDataHandle;
use crate::error::Result;

/// Association result of one stored rec-hit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HitAssociation {
    pub event_id: u32,
    pub hit_id: i64,
    pub det_id: u32,
    pub sub_detector: Option<String>,
    pub kind: RecHitKind,
    pub track_ids: Vec<u32>,
    pub charge_fractions: Vec<Option<f32>>,
    pub sim_hit_count: usize,
}

impl HitAssociation {
    pub fn new(event_id: u32, stored: &StoredRecHit, associated: &AssociatedHit) -> Self {
        let det_id = stored.hit.det_id();
        HitAssociation {
            event_id,
            hit_id: stored.hit_id,
            det_id: det_id.raw(),
            sub_detector: det_id.sub_detector().map(|s| s.to_string()),
            kind: stored.hit.kind(),
            track_ids: associated.track_ids(),
            charge_fractions: associated.contributions.iter().map(|c| c.charge_fraction).collect(),
            sim_hit_count: associated.sim_hits.len(),
        }
    }
}

/// Associates the rec-hits of an already loaded event.
pub fn associate_loaded_event(
    event: &InMemoryEvent,
    rec_hits: &[StoredRecHit],
    config: &AssociatorConfig,
) -> Result<Vec<HitAssociation>> {
    let associator = TrackerHitAssociator::with_config(event, config.clone())?;
    let hits: Vec<TrackerRecHit> = rec_hits.iter().map(|h| h.hit.clone()).collect();
    let results = associator.associate_hits(&hits);

    Ok(rec_hits
        .iter()
        .zip(results.iter())
        .map(|(stored, associated)| HitAssociation::new(event.event_id, stored, associated))
        .collect())
}

/// Loads one event from the store and associates all of its rec-hits.
pub fn associate_event(
    handle: &TrackerEventDataHandle,
    event_id: u32,
    config: &AssociatorConfig,
) -> Result<Vec<HitAssociation>> {
    config.validate()?;
    let event = handle.load_event(event_id)?;
    let rec_hits = handle.read_rec_hits(event_id)?;
    let associations = associate_loaded_event(&event, &rec_hits, config)?;
    info!(
        "event {}: {} of {} rec-hits associated",
        event_id,
        associations.iter().filter(|a| !a.track_ids.is_empty()).count(),
        associations.len()
    );
    Ok(associations)
}

/// Associates several events. Events are read one after the other and
/// associated in parallel; results follow the order of `event_ids`.
/// Repeated ids are processed once, at their first position.
pub fn associate_events(
    handle: &TrackerEventDataHandle,
    event_ids: &[u32],
    config: &AssociatorConfig,
) -> Result<Vec<HitAssociation>> {
    config.validate()?;
    let event_ids = distinct_event_ids(event_ids);
    let mut loaded = Vec::with_capacity(event_ids.len());
    for &event_id in &event_ids {
        loaded.push((handle.load_event(event_id)?, handle.read_rec_hits(event_id)?));
    }

    let per_event: Vec<Vec<HitAssociation>> = loaded
        .par_iter()
        .map(|(event, rec_hits)| associate_loaded_event(event, rec_hits, config))
        .collect::<Result<_>>()?;

    let associations: Vec<HitAssociation> = per_event.into_iter().flatten().collect();
    info!("associated {} rec-hits in {} events", associations.len(), event_ids.len());
    Ok(associations)
}

/// Event ids in first-seen order without repeats.
pub fn distinct_event_ids(event_ids: &[u32]) -> Vec<u32> {
    event_ids.iter().copied().unique().collect()
}

/// Writes associations as pretty-printed JSON.
pub fn write_associations_json<W: Write>(writer: W, associations: &[HitAssociation]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, associations)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_associations_json_file(path: &Path, associations: &[HitAssociation]) -> Result<()> {
    let file = File::create(path)?;
    write_associations_json(file, associations)
}
