use crate::events::{GoodsEvent, ShareEvent};

/// Staging buffer for the events one reconciliation pass produces.
/// Nothing leaves the buffer until the transaction has committed and the
/// orchestrator drains it into the publisher.
#[derive(Debug, Default)]
pub struct EventCollection {
    share_events: Vec<ShareEvent>,
    goods_events: Vec<GoodsEvent>,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_share_event(&mut self, event: ShareEvent) {
        self.share_events.push(event);
    }

    pub fn add_goods_event(&mut self, event: GoodsEvent) {
        self.goods_events.push(event);
    }

    pub fn share_events(&self) -> &[ShareEvent] {
        &self.share_events
    }

    pub fn goods_events(&self) -> &[GoodsEvent] {
        &self.goods_events
    }

    pub fn is_empty(&self) -> bool {
        self.share_events.is_empty() && self.goods_events.is_empty()
    }

    /// FIFO order within each kind is preserved.
    pub fn into_parts(self) -> (Vec<ShareEvent>, Vec<GoodsEvent>) {
        (self.share_events, self.goods_events)
    }
}
