//! Hit-to-track association.
//!
//! Associates reconstructed tracker hits with the simulated tracks that
//! deposited their charge, using the digi-sim links of the hit's module:
//!
//! - **simple strip hits**: tracks carrying more than the configured share
//!   (default 50%) of the cluster charge, ranked by that share
//! - **matched strip hits**: tracks found on both the mono and the stereo side
//! - **pixel hits**: every track linked to a pixel inside the cluster's
//!   bounding rectangle
//!
//! The strategies are free functions over explicit lookup tables;
//! [`TrackerHitAssociator`] bundles the tables of one event and dispatches on
//! the hit variant. Missing tables, modules or clusters give empty results.

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, info};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithm::config::AssociatorConfig;
use crate::algorithm::selector::PdgIdExcluder;
use crate::data::det_id::DetId;
use crate::data::event::EventSource;
use crate::data::rec_hit::{MatchedStripRecHit2D, PixelRecHit, StripRecHit2D, TrackerRecHit};
use crate::data::sim_hit::{SimHit, SimTrackId};
use crate::error::Result;
use crate::simulation::digi_sim_link::{DigiSimLink, PixelLinkTable, StripLinkTable};
use crate::simulation::sim_hit_map::SimHitMap;

/// A simulated track associated with a hit.
///
/// `charge_fraction` is the track's share of the cluster charge for strip
/// hits and `None` for pixel hits, which are not charge-weighted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackContribution {
    pub track_id: SimTrackId,
    pub charge_fraction: Option<f32>,
}

impl TrackContribution {
    pub fn with_fraction(track_id: SimTrackId, charge_fraction: f32) -> Self {
        TrackContribution { track_id, charge_fraction: Some(charge_fraction) }
    }

    pub fn without_fraction(track_id: SimTrackId) -> Self {
        TrackContribution { track_id, charge_fraction: None }
    }
}

/// Full association of one hit: contributing tracks and their simulated hits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociatedHit {
    pub contributions: Vec<TrackContribution>,
    pub sim_hits: Vec<SimHit>,
}

impl AssociatedHit {
    pub fn track_ids(&self) -> Vec<SimTrackId> {
        self.contributions.iter().map(|c| c.track_id).collect()
    }
}

/// Tracks carrying more than `cut` of a strip cluster's charge.
///
/// # Arguments
///
/// * `links` - strip digi-sim links of the event
/// * `hit` - strip hit whose cluster is examined
/// * `cut` - exclusive lower bound on the charge fraction
///
/// # Returns
///
/// * contributions ordered by descending charge fraction; tracks with equal
///   fractions keep the order in which their first link was seen
///
pub fn associate_simple_strip(
    links: &StripLinkTable,
    hit: &StripRecHit2D,
    cut: f32,
) -> Vec<TrackContribution> {
    let module_links = match links.find(hit.det_id) {
        Some(module_links) => module_links,
        None => return Vec::new(),
    };

    let cluster = &hit.cluster;
    let total_charge = cluster.total_charge();
    if total_charge <= 0.0 {
        return Vec::new();
    }
    let range = cluster.channel_range();

    // first-seen order of the tracks and their accumulated charge
    let mut track_order: Vec<SimTrackId> = Vec::new();
    let mut track_charge: HashMap<SimTrackId, f32> = HashMap::new();

    for link in module_links.iter().filter(|l| range.contains(&l.channel())) {
        let amplitude = match cluster.amplitude(link.channel()) {
            Some(amplitude) => amplitude as f32,
            None => continue,
        };
        let charge = amplitude * link.fraction();
        match track_charge.entry(link.sim_track_id()) {
            Entry::Vacant(entry) => {
                track_order.push(link.sim_track_id());
                entry.insert(charge);
            }
            Entry::Occupied(mut entry) => *entry.get_mut() += charge,
        }
    }

    let mut selected: Vec<TrackContribution> = track_order
        .into_iter()
        .filter_map(|track_id| {
            let fraction = track_charge[&track_id] / total_charge;
            (fraction > cut).then(|| TrackContribution::with_fraction(track_id, fraction))
        })
        .collect();

    // stable: equal fractions stay in first-seen order
    selected.sort_by_key(|c| Reverse(OrderedFloat(c.charge_fraction.unwrap_or(0.0))));
    selected
}

/// Tracks associated with both constituents of a matched hit.
///
/// Mono and stereo sides are associated independently; the result keeps the
/// mono side's order and reports the smaller of the two charge fractions.
pub fn associate_matched_strip(
    links: &StripLinkTable,
    hit: &MatchedStripRecHit2D,
    cut: f32,
) -> Vec<TrackContribution> {
    let mono = associate_simple_strip(links, &hit.mono, cut);
    if mono.is_empty() {
        return Vec::new();
    }
    let stereo = associate_simple_strip(links, &hit.stereo, cut);

    mono.iter()
        .unique_by(|c| c.track_id)
        .filter_map(|m| {
            stereo.iter().find(|s| s.track_id == m.track_id).map(|s| TrackContribution {
                track_id: m.track_id,
                charge_fraction: match (m.charge_fraction, s.charge_fraction) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                },
            })
        })
        .collect()
}

/// Tracks linked to any pixel inside the cluster's bounding rectangle
/// (bounds inclusive), in first-seen order.
pub fn associate_pixel(links: &PixelLinkTable, hit: &PixelRecHit) -> Vec<TrackContribution> {
    let module_links = match links.find(hit.det_id) {
        Some(module_links) => module_links,
        None => return Vec::new(),
    };
    let bounds = match hit.cluster.bounds() {
        Some(bounds) => bounds,
        None => return Vec::new(),
    };

    module_links
        .iter()
        .filter(|link| {
            let (row, col) = link.pixel();
            bounds.contains(row, col)
        })
        .map(|link| link.sim_track_id())
        .unique()
        .map(TrackContribution::without_fraction)
        .collect()
}

/// Associates the rec-hits of one event with its simulated tracks.
///
/// # Description
///
/// Built once per event from an [`EventSource`]. The lookup tables are
/// immutable afterwards and every query works on its own scratch state, so
/// queries take `&self` and can run concurrently.
///
/// # Example
///
/// ```rust
/// # use trkcore::algorithm::association::TrackerHitAssociator;
/// # use trkcore::data::cluster::StripCluster;
/// # use trkcore::data::det_id::{DetId, SubDetector};
/// # use trkcore::data::event::InMemoryEvent;
/// # use trkcore::data::rec_hit::{StripRecHit2D, TrackerRecHit};
/// # use trkcore::simulation::digi_sim_link::{StripDigiSimLink, StripLinkTable};
/// let det = DetId::tracker(SubDetector::Tib, 7);
/// let links: StripLinkTable = vec![(det, StripDigiSimLink::new(3, 42, 1.0))].into_iter().collect();
/// let event = InMemoryEvent::new(1).with_strip_links("siStripDigis", links);
///
/// let associator = TrackerHitAssociator::new(&event);
/// let hit = TrackerRecHit::SimpleStrip(StripRecHit2D::new(det, StripCluster::new(3, vec![50])));
/// assert_eq!(associator.associate_hit_id(&hit), vec![42]);
/// ```
#[derive(Clone, Debug)]
pub struct TrackerHitAssociator {
    config: AssociatorConfig,
    sim_hits: SimHitMap,
    strip_links: StripLinkTable,
    pixel_links: PixelLinkTable,
    excluder: PdgIdExcluder,
}

impl TrackerHitAssociator {
    pub fn new<E: EventSource + ?Sized>(event: &E) -> Self {
        Self::load(event, AssociatorConfig::default())
    }

    /// Loads the configured collections from `event`. Absent products leave
    /// the corresponding table empty.
    ///
    /// # Returns
    ///
    /// * `TrkError::Config` if `config` does not pass [`AssociatorConfig::validate`]
    ///
    pub fn with_config<E: EventSource + ?Sized>(event: &E, config: AssociatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::load(event, config))
    }

    fn load<E: EventSource + ?Sized>(event: &E, config: AssociatorConfig) -> Self {
        let mut sim_hits = SimHitMap::new();
        for label in &config.rou_list {
            match event.sim_hits(label) {
                Some(hits) => sim_hits.extend(hits),
                None => debug!("no simulated hits under label '{}'", label),
            }
        }

        let strip_links = if config.associate_strip {
            event.strip_digi_sim_links(&config.strip_link_label).cloned().unwrap_or_else(|| {
                debug!("no strip digi-sim links under label '{}'", config.strip_link_label);
                StripLinkTable::new()
            })
        } else {
            StripLinkTable::new()
        };

        let pixel_links = if config.associate_pixel {
            event.pixel_digi_sim_links(&config.pixel_link_label).cloned().unwrap_or_else(|| {
                debug!("no pixel digi-sim links under label '{}'", config.pixel_link_label);
                PixelLinkTable::new()
            })
        } else {
            PixelLinkTable::new()
        };

        info!(
            "associator loaded {} sim hits on {} modules, strip links on {} modules, pixel links on {} modules",
            sim_hits.num_hits(),
            sim_hits.len(),
            strip_links.len(),
            pixel_links.len(),
        );

        Self::assemble(config, sim_hits, strip_links, pixel_links)
    }

    /// Builds an associator from tables the caller already holds. The config
    /// is validated as in [`TrackerHitAssociator::with_config`].
    pub fn from_tables(
        config: AssociatorConfig,
        sim_hits: SimHitMap,
        strip_links: StripLinkTable,
        pixel_links: PixelLinkTable,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, sim_hits, strip_links, pixel_links))
    }

    fn assemble(
        config: AssociatorConfig,
        sim_hits: SimHitMap,
        strip_links: StripLinkTable,
        pixel_links: PixelLinkTable,
    ) -> Self {
        let excluder = PdgIdExcluder::from_config(&config);
        TrackerHitAssociator { config, sim_hits, strip_links, pixel_links, excluder }
    }

    /// Contributing tracks of `hit` with their charge fractions.
    pub fn associate_hit_contributions(&self, hit: &TrackerRecHit) -> Vec<TrackContribution> {
        let cut = self.config.charge_fraction_cut;
        match hit {
            TrackerRecHit::SimpleStrip(strip) if strip.det_id.is_strip() => {
                associate_simple_strip(&self.strip_links, strip, cut)
            }
            TrackerRecHit::MatchedStrip(matched) if matched.det_id.is_strip() => {
                associate_matched_strip(&self.strip_links, matched, cut)
            }
            TrackerRecHit::Pixel(pixel) if pixel.det_id.is_pixel() => {
                associate_pixel(&self.pixel_links, pixel)
            }
            _ => Vec::new(),
        }
    }

    /// Ids of the simulated tracks that produced `hit`.
    pub fn associate_hit_id(&self, hit: &TrackerRecHit) -> Vec<SimTrackId> {
        self.associate_hit_contributions(hit).into_iter().map(|c| c.track_id).collect()
    }

    /// Simulated hits of the associated tracks in the hit's module.
    ///
    /// A glued module has no simulated hits of its own; they are taken from
    /// its mono partition followed by its stereo partition, provided both
    /// exist.
    pub fn associate_hit(&self, hit: &TrackerRecHit) -> Vec<SimHit> {
        let track_ids = self.associate_hit_id(hit);
        self.sim_hits_of_tracks(hit.det_id(), &track_ids)
    }

    /// Contributions and simulated hits of `hit` in one pass.
    pub fn associate(&self, hit: &TrackerRecHit) -> AssociatedHit {
        let contributions = self.associate_hit_contributions(hit);
        let track_ids: Vec<SimTrackId> = contributions.iter().map(|c| c.track_id).collect();
        let sim_hits = self.sim_hits_of_tracks(hit.det_id(), &track_ids);
        AssociatedHit { contributions, sim_hits }
    }

    /// Associates many hits in parallel; results are in input order.
    pub fn associate_hits(&self, hits: &[TrackerRecHit]) -> Vec<AssociatedHit> {
        hits.par_iter().map(|hit| self.associate(hit)).collect()
    }

    fn sim_hits_of_tracks(&self, det_id: DetId, track_ids: &[SimTrackId]) -> Vec<SimHit> {
        if track_ids.is_empty() {
            return Vec::new();
        }
        self.module_sim_hits(det_id)
            .into_iter()
            .filter(|h| track_ids.contains(&h.track_id) && self.excluder.accepts(h))
            .copied()
            .collect()
    }

    fn module_sim_hits(&self, det_id: DetId) -> Vec<&SimHit> {
        if let Some(hits) = self.sim_hits.get(det_id) {
            return hits.iter().collect();
        }
        match (
            self.sim_hits.get(det_id.mono_partition()),
            self.sim_hits.get(det_id.stereo_partition()),
        ) {
            (Some(mono), Some(stereo)) => mono.iter().chain(stereo.iter()).collect(),
            _ => Vec::new(),
        }
    }
}
