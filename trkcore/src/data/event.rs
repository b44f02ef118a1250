use std::collections::BTreeMap;

use crate::data::sim_hit::SimHit;
use crate::simulation::digi_sim_link::{PixelLinkTable, StripLinkTable};

/// Read access to the products of one event that the associator consumes.
///
/// Every accessor returns `None` when the event has no product under the
/// requested label.
pub trait EventSource {
    /// Simulated hits of one module-group collection.
    fn sim_hits(&self, label: &str) -> Option<&[SimHit]>;

    fn strip_digi_sim_links(&self, label: &str) -> Option<&StripLinkTable>;

    fn pixel_digi_sim_links(&self, label: &str) -> Option<&PixelLinkTable>;
}

/// Event held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEvent {
    pub event_id: u32,
    pub sim_hits: BTreeMap<String, Vec<SimHit>>,
    pub strip_links: BTreeMap<String, StripLinkTable>,
    pub pixel_links: BTreeMap<String, PixelLinkTable>,
}

impl InMemoryEvent {
    pub fn new(event_id: u32) -> Self {
        InMemoryEvent { event_id, ..Default::default() }
    }

    pub fn with_sim_hits(mut self, label: &str, hits: Vec<SimHit>) -> Self {
        self.sim_hits.entry(label.to_string()).or_insert_with(Vec::new).extend(hits);
        self
    }

    pub fn with_strip_links(mut self, label: &str, table: StripLinkTable) -> Self {
        self.strip_links.insert(label.to_string(), table);
        self
    }

    pub fn with_pixel_links(mut self, label: &str, table: PixelLinkTable) -> Self {
        self.pixel_links.insert(label.to_string(), table);
        self
    }
}

impl EventSource for InMemoryEvent {
    fn sim_hits(&self, label: &str) -> Option<&[SimHit]> {
        self.sim_hits.get(label).map(|v| v.as_slice())
    }

    fn strip_digi_sim_links(&self, label: &str) -> Option<&StripLinkTable> {
        self.strip_links.get(label)
    }

    fn pixel_digi_sim_links(&self, label: &str) -> Option<&PixelLinkTable> {
        self.pixel_links.get(label)
    }
}
