use std::collections::BTreeMap;

use crate::data::det_id::DetId;
use crate::data::sim_hit::SimHit;

/// Simulated hits grouped by module, in the order they were added.
#[derive(Clone, Debug, Default)]
pub struct SimHitMap {
    hits: BTreeMap<DetId, Vec<SimHit>>,
}

impl SimHitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hit: SimHit) {
        self.hits.entry(hit.det_unit_id).or_insert_with(Vec::new).push(hit);
    }

    pub fn extend<'a>(&mut self, hits: impl IntoIterator<Item = &'a SimHit>) {
        for hit in hits {
            self.push(*hit);
        }
    }

    pub fn get(&self, det_id: DetId) -> Option<&[SimHit]> {
        self.hits.get(&det_id).map(|v| v.as_slice())
    }

    /// Number of modules with at least one hit.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn num_hits(&self) -> usize {
        self.hits.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sim_hit::LocalPoint;

    #[test]
    fn test_groups_by_module_in_insertion_order() {
        let a = DetId::new(1);
        let b = DetId::new(2);
        let mut map = SimHitMap::new();
        map.extend(&[
            SimHit::new(a, 5, LocalPoint::default()),
            SimHit::new(b, 6, LocalPoint::default()),
            SimHit::new(a, 3, LocalPoint::default()),
        ]);

        let on_a: Vec<u32> = map.get(a).unwrap().iter().map(|h| h.track_id).collect();
        assert_eq!(on_a, vec![5, 3]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.num_hits(), 3);
        assert!(map.get(DetId::new(3)).is_none());
    }
}
