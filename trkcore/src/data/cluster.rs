use std::ops::Range;
use serde::{Deserialize, Serialize};

/// Contiguous run of strips with their amplitudes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StripCluster {
    pub first_strip: u16,
    pub amplitudes: Vec<u16>,
}

impl StripCluster {
    pub fn new(first_strip: u16, amplitudes: Vec<u16>) -> Self {
        StripCluster { first_strip, amplitudes }
    }

    /// Half-open channel range `[first, first + size)` covered by the cluster.
    pub fn channel_range(&self) -> Range<u32> {
        let first = self.first_strip as u32;
        first..first + self.amplitudes.len() as u32
    }

    /// Amplitude of an absolute strip number, `None` outside the cluster.
    pub fn amplitude(&self, channel: u32) -> Option<u16> {
        let offset = channel.checked_sub(self.first_strip as u32)?;
        self.amplitudes.get(offset as usize).copied()
    }

    pub fn total_charge(&self) -> f32 {
        self.amplitudes.iter().map(|&a| a as f32).sum()
    }
}

/// Single pixel of a pixel cluster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub row: u16,
    pub col: u16,
    pub adc: u16,
}

/// Pixel cluster with its inclusive bounding rectangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelCluster {
    pub pixels: Vec<Pixel>,
}

impl PixelCluster {
    pub fn new(pixels: Vec<Pixel>) -> Self {
        PixelCluster { pixels }
    }

    pub fn min_pixel_row(&self) -> Option<u16> {
        self.pixels.iter().map(|p| p.row).min()
    }

    pub fn max_pixel_row(&self) -> Option<u16> {
        self.pixels.iter().map(|p| p.row).max()
    }

    pub fn min_pixel_col(&self) -> Option<u16> {
        self.pixels.iter().map(|p| p.col).min()
    }

    pub fn max_pixel_col(&self) -> Option<u16> {
        self.pixels.iter().map(|p| p.col).max()
    }

    /// Inclusive bounding rectangle of the cluster, `None` when it has no pixels.
    pub fn bounds(&self) -> Option<PixelBounds> {
        Some(PixelBounds {
            min_row: self.min_pixel_row()?,
            max_row: self.max_pixel_row()?,
            min_col: self.min_pixel_col()?,
            max_col: self.max_pixel_col()?,
        })
    }
}

/// Inclusive pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_row: u16,
    pub max_row: u16,
    pub min_col: u16,
    pub max_col: u16,
}

impl PixelBounds {
    pub fn contains(&self, row: u16, col: u16) -> bool {
        row >= self.min_row && row <= self.max_row && col >= self.min_col && col <= self.max_col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_cluster_range_and_charge() {
        let cluster = StripCluster::new(10, vec![20, 20, 20, 20, 20]);
        assert_eq!(cluster.channel_range(), 10..15);
        assert_eq!(cluster.total_charge(), 100.0);
        assert_eq!(cluster.amplitude(10), Some(20));
        assert_eq!(cluster.amplitude(9), None);
        assert_eq!(cluster.amplitude(15), None);
    }

    #[test]
    fn test_pixel_bounds() {
        let cluster = PixelCluster::new(vec![
            Pixel { row: 5, col: 12, adc: 30 },
            Pixel { row: 7, col: 10, adc: 40 },
            Pixel { row: 6, col: 11, adc: 50 },
        ]);
        let bounds = cluster.bounds().unwrap();
        assert_eq!(bounds, PixelBounds { min_row: 5, max_row: 7, min_col: 10, max_col: 12 });
        assert!(bounds.contains(5, 10));
        assert!(bounds.contains(7, 12));
        assert!(!bounds.contains(8, 12));
        assert!(!bounds.contains(7, 9));
    }

    #[test]
    fn test_empty_pixel_cluster_has_no_bounds() {
        assert!(PixelCluster::new(vec![]).bounds().is_none());
    }
}
