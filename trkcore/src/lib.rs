// data module
pub mod data {
    pub mod det_id;
    pub mod sim_hit;
    pub mod cluster;
    pub mod rec_hit;
    pub mod event;
}

// simulation products module
pub mod simulation {
    pub mod digi_sim_link;
    pub mod sim_hit_map;
}

// algorithm module
pub mod algorithm {
    pub mod config;
    pub mod selector;
    pub mod association;
}

pub mod error;

pub use algorithm::association::{AssociatedHit, TrackContribution, TrackerHitAssociator};
pub use algorithm::config::AssociatorConfig;
pub use data::det_id::{DetId, SubDetector};
pub use data::event::{EventSource, InMemoryEvent};
pub use data::rec_hit::{RecHitKind, TrackerRecHit};
pub use data::sim_hit::{SimHit, SimTrackId};
pub use error::TrkError;
