use serde::{Deserialize, Serialize};

use crate::data::det_id::DetId;

/// Identifier of a simulated particle track.
pub type SimTrackId = u32;

/// Point in the local frame of a module, in cm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LocalPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        LocalPoint { x, y, z }
    }

    pub fn midpoint(&self, other: &LocalPoint) -> LocalPoint {
        LocalPoint {
            x: 0.5 * (self.x + other.x),
            y: 0.5 * (self.y + other.y),
            z: 0.5 * (self.z + other.z),
        }
    }
}

/// Energy deposit of one simulated particle crossing one module.
///
/// # Description
///
/// Simulated hits are produced upstream by the detector simulation and are
/// read-only here. The associator only looks at `det_unit_id` and `track_id`;
/// the remaining attributes are carried so that callers can inspect the
/// matched hits.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimHit {
    pub det_unit_id: DetId,
    pub track_id: SimTrackId,
    pub entry_point: LocalPoint,
    pub exit_point: LocalPoint,
    pub p_abs: f32,
    pub tof: f32,
    pub energy_loss: f32,
    pub particle_type: i32,
    pub process_type: u16,
}

impl SimHit {
    /// Minimal constructor: a hit of `track_id` in `det_unit_id` entering and
    /// leaving the module at the same point.
    pub fn new(det_unit_id: DetId, track_id: SimTrackId, position: LocalPoint) -> Self {
        SimHit {
            det_unit_id,
            track_id,
            entry_point: position,
            exit_point: position,
            p_abs: 0.0,
            tof: 0.0,
            energy_loss: 0.0,
            particle_type: 0,
            process_type: 0,
        }
    }

    pub fn with_path(mut self, entry_point: LocalPoint, exit_point: LocalPoint) -> Self {
        self.entry_point = entry_point;
        self.exit_point = exit_point;
        self
    }

    pub fn with_particle_type(mut self, particle_type: i32) -> Self {
        self.particle_type = particle_type;
        self
    }

    /// Local position of the hit, the midpoint of the entry and exit points.
    pub fn local_position(&self) -> LocalPoint {
        self.entry_point.midpoint(&self.exit_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_position_is_midpoint() {
        let hit = SimHit::new(DetId::new(1), 7, LocalPoint::default())
            .with_path(LocalPoint::new(-1.0, 0.0, -0.015), LocalPoint::new(1.0, 2.0, 0.015));
        let pos = hit.local_position();
        assert!((pos.x - 0.0).abs() < 1e-6);
        assert!((pos.y - 1.0).abs() < 1e-6);
        assert!(pos.z.abs() < 1e-6);
    }
}
