use serde::{Deserialize, Serialize};

use crate::algorithm::config::AssociatorConfig;
use crate::data::sim_hit::SimHit;

/// Rejects simulated hits from particles whose |PDG id| is listed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PdgIdExcluder {
    pub pdg_ids: Vec<u32>,
}

impl PdgIdExcluder {
    pub fn new(pdg_ids: Vec<i32>) -> Self {
        PdgIdExcluder {
            pdg_ids: pdg_ids.into_iter().map(i32::unsigned_abs).collect(),
        }
    }

    pub fn from_config(config: &AssociatorConfig) -> Self {
        Self::new(config.excluded_pdg_ids.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.pdg_ids.is_empty()
    }

    #[inline]
    pub fn accepts(&self, hit: &SimHit) -> bool {
        if self.pdg_ids.is_empty() {
            return true;
        }
        !self.pdg_ids.contains(&hit.particle_type.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::det_id::DetId;
    use crate::data::sim_hit::LocalPoint;

    fn hit(pdg: i32) -> SimHit {
        SimHit::new(DetId::new(1), 1, LocalPoint::default()).with_particle_type(pdg)
    }

    #[test]
    fn test_excludes_both_charges() {
        // electrons and positrons
        let excluder = PdgIdExcluder::new(vec![11]);
        assert!(!excluder.accepts(&hit(11)));
        assert!(!excluder.accepts(&hit(-11)));
        assert!(excluder.accepts(&hit(13)));
    }

    #[test]
    fn test_negative_ids_in_list_are_normalised() {
        let excluder = PdgIdExcluder::new(vec![-211]);
        assert!(!excluder.accepts(&hit(211)));
    }

    #[test]
    fn test_empty_excluder_accepts_everything() {
        let excluder = PdgIdExcluder::from_config(&AssociatorConfig::default());
        assert!(excluder.is_empty());
        assert!(excluder.accepts(&hit(11)));
    }

    #[test]
    fn test_most_negative_pdg_id() {
        assert!(PdgIdExcluder::default().accepts(&hit(i32::MIN)));
        assert!(PdgIdExcluder::new(vec![13]).accepts(&hit(i32::MIN)));

        let excluder = PdgIdExcluder::new(vec![i32::MIN]);
        assert_eq!(excluder.pdg_ids, vec![1u32 << 31]);
        assert!(!excluder.accepts(&hit(i32::MIN)));
        assert!(excluder.accepts(&hit(i32::MAX)));
    }
}
