use std::fmt::{self, Display, Formatter};
use serde::{Deserialize, Serialize};

use crate::error::TrkError;

const DET_SHIFT: u32 = 28;
const DET_MASK: u32 = 0xF;
const SUBDET_SHIFT: u32 = 25;
const SUBDET_MASK: u32 = 0x7;

/// Detector code of the tracker in the top four bits of a `DetId`.
pub const TRACKER_DET: u32 = 1;

/// Offset from a glued module id to its stereo partition.
pub const STEREO_OFFSET: u32 = 1;
/// Offset from a glued module id to its mono (r-phi) partition.
pub const MONO_OFFSET: u32 = 2;

/// Tracker sub-detectors.
///
/// # Description
///
/// Pixel barrel and endcap are read out as 2D pixel arrays, the four strip
/// sub-detectors (inner barrel, inner disks, outer barrel, endcaps) as strips.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubDetector {
    PixelBarrel,
    PixelEndcap,
    Tib,
    Tid,
    Tob,
    Tec,
}

impl SubDetector {
    /// Returns the numeric code stored in bits 25..27 of a `DetId`.
    pub fn code(&self) -> u32 {
        match self {
            SubDetector::PixelBarrel => 1,
            SubDetector::PixelEndcap => 2,
            SubDetector::Tib => 3,
            SubDetector::Tid => 4,
            SubDetector::Tob => 5,
            SubDetector::Tec => 6,
        }
    }

    pub fn is_strip(&self) -> bool {
        matches!(self, SubDetector::Tib | SubDetector::Tid | SubDetector::Tob | SubDetector::Tec)
    }

    pub fn is_pixel(&self) -> bool {
        matches!(self, SubDetector::PixelBarrel | SubDetector::PixelEndcap)
    }
}

impl TryFrom<u32> for SubDetector {
    type Error = TrkError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SubDetector::PixelBarrel),
            2 => Ok(SubDetector::PixelEndcap),
            3 => Ok(SubDetector::Tib),
            4 => Ok(SubDetector::Tid),
            5 => Ok(SubDetector::Tob),
            6 => Ok(SubDetector::Tec),
            _ => Err(TrkError::InvalidSubDetector(code)),
        }
    }
}

impl Display for SubDetector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubDetector::PixelBarrel => write!(f, "PixelBarrel"),
            SubDetector::PixelEndcap => write!(f, "PixelEndcap"),
            SubDetector::Tib => write!(f, "TIB"),
            SubDetector::Tid => write!(f, "TID"),
            SubDetector::Tob => write!(f, "TOB"),
            SubDetector::Tec => write!(f, "TEC"),
        }
    }
}

/// Raw 32-bit module identifier.
///
/// The value is opaque to the associator except for the sub-detector field
/// and the glued-module partition offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetId(u32);

impl DetId {
    pub fn new(raw: u32) -> Self {
        DetId(raw)
    }

    /// Builds a tracker module id from a sub-detector and a module index.
    ///
    /// # Arguments
    ///
    /// * `sub_detector` - sub-detector the module belongs to
    /// * `module` - index within the sub-detector, truncated to 25 bits
    ///
    /// # Example
    ///
    /// ```rust
    /// # use trkcore::data::det_id::{DetId, SubDetector};
    /// let id = DetId::tracker(SubDetector::Tob, 40);
    /// assert_eq!(id.sub_detector(), Some(SubDetector::Tob));
    /// assert!(id.is_strip());
    /// ```
    pub fn tracker(sub_detector: SubDetector, module: u32) -> Self {
        DetId(
            (TRACKER_DET << DET_SHIFT)
                | (sub_detector.code() << SUBDET_SHIFT)
                | (module & ((1 << SUBDET_SHIFT) - 1)),
        )
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn det(&self) -> u32 {
        (self.0 >> DET_SHIFT) & DET_MASK
    }

    pub fn sub_det_code(&self) -> u32 {
        (self.0 >> SUBDET_SHIFT) & SUBDET_MASK
    }

    /// Sub-detector of a tracker module, `None` outside the tracker.
    pub fn sub_detector(&self) -> Option<SubDetector> {
        if self.det() != TRACKER_DET {
            return None;
        }
        SubDetector::try_from(self.sub_det_code()).ok()
    }

    pub fn is_strip(&self) -> bool {
        self.sub_detector().map_or(false, |s| s.is_strip())
    }

    pub fn is_pixel(&self) -> bool {
        self.sub_detector().map_or(false, |s| s.is_pixel())
    }

    /// Stereo partition of a glued module.
    pub fn stereo_partition(&self) -> DetId {
        DetId(self.0.wrapping_add(STEREO_OFFSET))
    }

    /// Mono (r-phi) partition of a glued module.
    pub fn mono_partition(&self) -> DetId {
        DetId(self.0.wrapping_add(MONO_OFFSET))
    }
}

impl From<u32> for DetId {
    fn from(raw: u32) -> Self {
        DetId(raw)
    }
}

impl Display for DetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
