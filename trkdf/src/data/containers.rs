use serde::{Deserialize, Serialize};
use trkcore::data::cluster::{PixelCluster, StripCluster};
use trkcore::data::det_id::DetId;
use trkcore::data::rec_hit::{RecHitKind, TrackerRecHit};

/// Row of the `rec_hits` table.
///
/// Simple strip and pixel hits point at a cluster, matched hits at the two
/// simple strip hits they were built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecHitRow {
    pub hit_id: i64,
    pub kind: RecHitKind,
    pub det_id: DetId,
    pub cluster_id: Option<i64>,
    pub mono_hit_id: Option<i64>,
    pub stereo_hit_id: Option<i64>,
}

impl RecHitRow {
    pub fn simple_strip(hit_id: i64, det_id: DetId, cluster_id: i64) -> Self {
        RecHitRow {
            hit_id,
            kind: RecHitKind::SimpleStrip,
            det_id,
            cluster_id: Some(cluster_id),
            mono_hit_id: None,
            stereo_hit_id: None,
        }
    }

    pub fn matched_strip(hit_id: i64, det_id: DetId, mono_hit_id: i64, stereo_hit_id: i64) -> Self {
        RecHitRow {
            hit_id,
            kind: RecHitKind::MatchedStrip,
            det_id,
            cluster_id: None,
            mono_hit_id: Some(mono_hit_id),
            stereo_hit_id: Some(stereo_hit_id),
        }
    }

    pub fn pixel(hit_id: i64, det_id: DetId, cluster_id: i64) -> Self {
        RecHitRow {
            hit_id,
            kind: RecHitKind::Pixel,
            det_id,
            cluster_id: Some(cluster_id),
            mono_hit_id: None,
            stereo_hit_id: None,
        }
    }

    pub fn other(hit_id: i64, det_id: DetId) -> Self {
        RecHitRow {
            hit_id,
            kind: RecHitKind::Other,
            det_id,
            cluster_id: None,
            mono_hit_id: None,
            stereo_hit_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripClusterRow {
    pub cluster_id: i64,
    pub det_id: DetId,
    pub cluster: StripCluster,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelClusterRow {
    pub cluster_id: i64,
    pub det_id: DetId,
    pub cluster: PixelCluster,
}

/// Rec-hit resolved from the store, keyed by its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecHit {
    pub hit_id: i64,
    pub hit: TrackerRecHit,
}
