/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Interception pipeline.
//!
//! Operators queue replacement payloads; the outbound hook swaps the next
//! transmitted message for the head of the queue. The head is inspected and
//! removed under one lock, and only removed when the substitution is used.
//! A substitute whose transmission fails goes back to the head.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

/// Snapshot of the pending substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptStatus {
    /// Number of queued payloads.
    pub pending: usize,
    /// The payload the next transmission would use.
    pub head: Option<Bytes>,
}

/// Queue of replacement payloads.
#[derive(Debug, Default)]
pub struct InterceptQueue {
    pending: Mutex<VecDeque<Bytes>>,
}

impl InterceptQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a replacement for a future transmission.
    pub fn enqueue(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        debug!(len = payload.len(), "substitution queued");
        self.pending.lock().push_back(payload);
    }

    /// Offers the head payload to `use_payload`.
    ///
    /// The head is removed only if `use_payload` returns `Ok`; on `Err` it
    /// stays queued for the next transmission. Returns `None` when the queue
    /// is empty.
    pub fn take_with<T, E>(
        &self,
        use_payload: impl FnOnce(&Bytes) -> Result<T, E>,
    ) -> Option<Result<T, E>> {
        let mut pending = self.pending.lock();
        let head = pending.front()?;
        let result = use_payload(head);
        if result.is_ok() {
            pending.pop_front();
        }
        Some(result)
    }

    /// Puts `payload` back at the head, ahead of anything queued since.
    pub fn restore_front(&self, payload: Bytes) {
        debug!(len = payload.len(), "substitution requeued");
        self.pending.lock().push_front(payload);
    }

    /// Returns the head payload without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<Bytes> {
        self.pending.lock().front().cloned()
    }

    /// Returns the queue status.
    #[must_use]
    pub fn status(&self) -> InterceptStatus {
        let pending = self.pending.lock();
        InterceptStatus {
            pending: pending.len(),
            head: pending.front().cloned(),
        }
    }

    /// Drops every queued payload, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Returns the number of queued payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
