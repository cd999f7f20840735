//! Push source: producers POST samples, the scheduler drains them
//!
//! Samples land in a bounded FIFO buffer. When the buffer is full the oldest
//! sample is dropped so the newest data always gets through. Each poll
//! drains everything buffered since the previous one.

use async_trait::async_trait;
use fleet_core::normalize::raw_vehicle_id;
use fleet_core::{RawSample, SourceError, TelemetrySource};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Result of handing samples to the push buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReceipt {
    pub accepted: usize,
    /// Older buffered samples evicted to make room
    pub dropped: usize,
}

#[derive(Debug)]
struct Buffer {
    queue: VecDeque<RawSample>,
    capacity: usize,
}

impl Buffer {
    fn push(&mut self, raw: RawSample) -> bool {
        let dropped = if self.queue.len() >= self.capacity {
            self.queue.pop_front();
            true
        } else {
            false
        };
        self.queue.push_back(raw);
        dropped
    }
}

pub struct PushSource {
    buffer: Arc<Mutex<Buffer>>,
}

/// Producer-side handle to a `PushSource` buffer
#[derive(Clone)]
pub struct PushHandle {
    buffer: Arc<Mutex<Buffer>>,
}

impl PushSource {
    /// Create a push source holding at most `capacity` pending samples
    pub fn new(capacity: usize) -> Self {
        let buffer = Buffer {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
        };
        Self {
            buffer: Arc::new(Mutex::new(buffer)),
        }
    }

    pub fn handle(&self) -> PushHandle {
        PushHandle {
            buffer: self.buffer.clone(),
        }
    }
}

impl PushHandle {
    pub async fn push(&self, raw: RawSample) -> PushReceipt {
        self.push_many(vec![raw]).await
    }

    pub async fn push_many(&self, raws: Vec<RawSample>) -> PushReceipt {
        let mut buffer = self.buffer.lock().await;
        let mut receipt = PushReceipt::default();
        for raw in raws {
            receipt.accepted += 1;
            if buffer.push(raw) {
                receipt.dropped += 1;
            }
        }
        if receipt.dropped > 0 {
            warn!(
                "Push buffer full (capacity {}), dropped {} oldest sample(s)",
                buffer.capacity, receipt.dropped
            );
        }
        receipt
    }

    /// Samples waiting for the next poll
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.queue.len()
    }

    pub async fn capacity(&self) -> usize {
        self.buffer.lock().await.capacity
    }
}

#[async_trait]
impl TelemetrySource for PushSource {
    fn name(&self) -> &str {
        "push"
    }

    async fn fetch_all(&self) -> Result<Vec<RawSample>, SourceError> {
        let mut buffer = self.buffer.lock().await;
        Ok(buffer.queue.drain(..).collect())
    }

    /// Newest pending sample for `vehicle_id`; the buffer is left intact
    async fn fetch_vehicle(&self, vehicle_id: &str) -> Result<Option<RawSample>, SourceError> {
        let buffer = self.buffer.lock().await;
        Ok(buffer
            .queue
            .iter()
            .rev()
            .find(|raw| raw_vehicle_id(raw).as_deref() == Some(vehicle_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buffer = Buffer {
            queue: VecDeque::new(),
            capacity: 2,
        };
        assert!(!buffer.push(json!(1)));
        assert!(!buffer.push(json!(2)));
        assert!(buffer.push(json!(3)));
        assert_eq!(buffer.queue, VecDeque::from(vec![json!(2), json!(3)]));
    }

    #[tokio::test]
    async fn test_zero_capacity_clamped() {
        let source = PushSource::new(0);
        assert_eq!(source.handle().capacity().await, 1);
    }
}
