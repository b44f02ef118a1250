use std::fmt::{self, Display, Formatter};
use serde::{Deserialize, Serialize};

use crate::data::cluster::{PixelCluster, StripCluster};
use crate::data::det_id::DetId;

/// Hit reconstructed from a single strip cluster on one side of a module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StripRecHit2D {
    pub det_id: DetId,
    pub cluster: StripCluster,
}

impl StripRecHit2D {
    pub fn new(det_id: DetId, cluster: StripCluster) -> Self {
        StripRecHit2D { det_id, cluster }
    }
}

/// Stereo hit built from a mono and a stereo strip hit of a glued module.
///
/// `det_id` is the glued module; the constituents carry their own partition
/// ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedStripRecHit2D {
    pub det_id: DetId,
    pub mono: StripRecHit2D,
    pub stereo: StripRecHit2D,
}

impl MatchedStripRecHit2D {
    pub fn new(det_id: DetId, mono: StripRecHit2D, stereo: StripRecHit2D) -> Self {
        MatchedStripRecHit2D { det_id, mono, stereo }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelRecHit {
    pub det_id: DetId,
    pub cluster: PixelCluster,
}

impl PixelRecHit {
    pub fn new(det_id: DetId, cluster: PixelCluster) -> Self {
        PixelRecHit { det_id, cluster }
    }
}

/// Reconstructed tracker hit.
///
/// # Description
///
/// Each variant carries exactly what its association strategy reads.
/// `Other` stands for hit types the associator has no strategy for; they
/// associate to nothing.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrackerRecHit {
    SimpleStrip(StripRecHit2D),
    MatchedStrip(MatchedStripRecHit2D),
    Pixel(PixelRecHit),
    Other { det_id: DetId },
}

impl TrackerRecHit {
    pub fn det_id(&self) -> DetId {
        match self {
            TrackerRecHit::SimpleStrip(hit) => hit.det_id,
            TrackerRecHit::MatchedStrip(hit) => hit.det_id,
            TrackerRecHit::Pixel(hit) => hit.det_id,
            TrackerRecHit::Other { det_id } => *det_id,
        }
    }

    pub fn kind(&self) -> RecHitKind {
        match self {
            TrackerRecHit::SimpleStrip(_) => RecHitKind::SimpleStrip,
            TrackerRecHit::MatchedStrip(_) => RecHitKind::MatchedStrip,
            TrackerRecHit::Pixel(_) => RecHitKind::Pixel,
            TrackerRecHit::Other { .. } => RecHitKind::Other,
        }
    }
}

impl From<StripRecHit2D> for TrackerRecHit {
    fn from(hit: StripRecHit2D) -> Self {
        TrackerRecHit::SimpleStrip(hit)
    }
}

impl From<MatchedStripRecHit2D> for TrackerRecHit {
    fn from(hit: MatchedStripRecHit2D) -> Self {
        TrackerRecHit::MatchedStrip(hit)
    }
}

impl From<PixelRecHit> for TrackerRecHit {
    fn from(hit: PixelRecHit) -> Self {
        TrackerRecHit::Pixel(hit)
    }
}

/// Variant tag of a `TrackerRecHit`, as stored in the event store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecHitKind {
    SimpleStrip,
    MatchedStrip,
    Pixel,
    Other,
}

impl RecHitKind {
    /// Returns the `RecHitKind` for a stored code; unknown codes are `Other`.
    pub fn new(code: i64) -> Self {
        match code {
            0 => RecHitKind::SimpleStrip,
            1 => RecHitKind::MatchedStrip,
            2 => RecHitKind::Pixel,
            _ => RecHitKind::Other,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RecHitKind::SimpleStrip => 0,
            RecHitKind::MatchedStrip => 1,
            RecHitKind::Pixel => 2,
            RecHitKind::Other => -1,
        }
    }
}

impl Display for RecHitKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecHitKind::SimpleStrip => write!(f, "SimpleStrip"),
            RecHitKind::MatchedStrip => write!(f, "MatchedStrip"),
            RecHitKind::Pixel => write!(f, "Pixel"),
            RecHitKind::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in [RecHitKind::SimpleStrip, RecHitKind::MatchedStrip, RecHitKind::Pixel] {
            assert_eq!(RecHitKind::new(kind.code()), kind);
        }
        assert_eq!(RecHitKind::new(42), RecHitKind::Other);
        assert_eq!(RecHitKind::new(RecHitKind::Other.code()), RecHitKind::Other);
    }

    #[test]
    fn test_matched_hit_reports_glued_id() {
        let glued = DetId::new(400);
        let mono = StripRecHit2D::new(glued.mono_partition(), StripCluster::new(0, vec![1]));
        let stereo = StripRecHit2D::new(glued.stereo_partition(), StripCluster::new(0, vec![1]));
        let hit: TrackerRecHit = MatchedStripRecHit2D::new(glued, mono, stereo).into();
        assert_eq!(hit.det_id(), glued);
        assert_eq!(hit.kind(), RecHitKind::MatchedStrip);
    }
}
