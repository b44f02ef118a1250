use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::data::det_id::DetId;
use crate::data::sim_hit::SimTrackId;

const PIXEL_ROW_WIDTH: u32 = 8;
const PIXEL_COLUMN_WIDTH: u32 = 9;
const PIXEL_ROW_MASK: u32 = (1 << PIXEL_ROW_WIDTH) - 1;
const PIXEL_COLUMN_MASK: u32 = (1 << PIXEL_COLUMN_WIDTH) - 1;

/// Packs a pixel coordinate into a readout channel: row in bits 0..7, column
/// in bits 8..16. Out-of-range coordinates are truncated to their field.
pub fn pixel_to_channel(row: u16, col: u16) -> u32 {
    (row as u32 & PIXEL_ROW_MASK) | ((col as u32 & PIXEL_COLUMN_MASK) << PIXEL_ROW_WIDTH)
}

/// Inverse of `pixel_to_channel`, returns `(row, col)`.
pub fn channel_to_pixel(channel: u32) -> (u16, u16) {
    let row = channel & PIXEL_ROW_MASK;
    let col = (channel >> PIXEL_ROW_WIDTH) & PIXEL_COLUMN_MASK;
    (row as u16, col as u16)
}

/// Link between a readout channel and a simulated track contributing to it.
pub trait DigiSimLink {
    fn channel(&self) -> u32;
    fn sim_track_id(&self) -> SimTrackId;
    /// Fraction of the channel's signal due to this track.
    fn fraction(&self) -> f32;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StripDigiSimLink {
    pub channel: u32,
    pub sim_track_id: SimTrackId,
    pub fraction: f32,
}

impl StripDigiSimLink {
    pub fn new(channel: u32, sim_track_id: SimTrackId, fraction: f32) -> Self {
        StripDigiSimLink { channel, sim_track_id, fraction }
    }
}

impl DigiSimLink for StripDigiSimLink {
    fn channel(&self) -> u32 {
        self.channel
    }
    fn sim_track_id(&self) -> SimTrackId {
        self.sim_track_id
    }
    fn fraction(&self) -> f32 {
        self.fraction
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelDigiSimLink {
    pub channel: u32,
    pub sim_track_id: SimTrackId,
    pub fraction: f32,
}

impl PixelDigiSimLink {
    pub fn new(channel: u32, sim_track_id: SimTrackId, fraction: f32) -> Self {
        PixelDigiSimLink { channel, sim_track_id, fraction }
    }

    /// Link for the pixel at `(row, col)`.
    pub fn at_pixel(row: u16, col: u16, sim_track_id: SimTrackId, fraction: f32) -> Self {
        PixelDigiSimLink::new(pixel_to_channel(row, col), sim_track_id, fraction)
    }

    /// Decoded `(row, col)` of the linked pixel.
    pub fn pixel(&self) -> (u16, u16) {
        channel_to_pixel(self.channel)
    }
}

impl DigiSimLink for PixelDigiSimLink {
    fn channel(&self) -> u32 {
        self.channel
    }
    fn sim_track_id(&self) -> SimTrackId {
        self.sim_track_id
    }
    fn fraction(&self) -> f32 {
        self.fraction
    }
}

/// Digi-sim links grouped by module, in stored order within each module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigiSimLinkTable<L> {
    links: BTreeMap<DetId, Vec<L>>,
}

pub type StripLinkTable = DigiSimLinkTable<StripDigiSimLink>;
pub type PixelLinkTable = DigiSimLinkTable<PixelDigiSimLink>;

impl<L> Default for DigiSimLinkTable<L> {
    fn default() -> Self {
        DigiSimLinkTable { links: BTreeMap::new() }
    }
}

impl<L> DigiSimLinkTable<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, det_id: DetId, link: L) {
        self.links.entry(det_id).or_insert_with(Vec::new).push(link);
    }

    /// Links of one module, `None` if the module has no entry.
    pub fn find(&self, det_id: DetId) -> Option<&[L]> {
        self.links.get(&det_id).map(|v| v.as_slice())
    }

    /// Number of modules with links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn num_links(&self) -> usize {
        self.links.values().map(|v| v.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DetId, &Vec<L>)> {
        self.links.iter()
    }
}

impl<L> FromIterator<(DetId, L)> for DigiSimLinkTable<L> {
    fn from_iter<I: IntoIterator<Item = (DetId, L)>>(iter: I) -> Self {
        let mut table = DigiSimLinkTable::new();
        for (det_id, link) in iter {
            table.push(det_id, link);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_channel_packing() {
        for (row, col) in [(0, 0), (1, 0), (0, 1), (255, 511), (80, 415)] {
            assert_eq!(channel_to_pixel(pixel_to_channel(row, col)), (row, col));
        }
        assert_eq!(pixel_to_channel(3, 2), 3 | (2 << 8));
    }

    #[test]
    fn test_table_preserves_module_order() {
        let det = DetId::new(10);
        let table: StripLinkTable = vec![
            (det, StripDigiSimLink::new(4, 2, 1.0)),
            (DetId::new(11), StripDigiSimLink::new(1, 9, 1.0)),
            (det, StripDigiSimLink::new(3, 1, 0.5)),
        ]
        .into_iter()
        .collect();

        let links = table.find(det).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].sim_track_id, 2);
        assert_eq!(links[1].sim_track_id, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.num_links(), 3);
        assert!(table.find(DetId::new(12)).is_none());
    }
}
