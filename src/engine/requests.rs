// Outbound requests to host collaborators (audio, palette loading)
//
// Scripts never talk to audio or resource loading directly; they enqueue a
// request and the host drains the queue once per frame.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A request for a collaborator outside the scripting core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostRequest {
    /// Start playing a sound resource
    PlaySound(u32),
    /// Stop a sound resource
    StopSound(u32),
    /// Load and apply a palette resource
    LoadPalette(u32),
}

/// Growable FIFO of host requests
///
/// The queue never drops requests. Going past `soft_capacity` signals that a
/// script floods the host, which is reported as a development error.
#[derive(Debug)]
pub struct RequestQueue {
    queue: VecDeque<HostRequest>,
    soft_capacity: usize,
    strict: bool,
    overflowed: bool,
}

impl RequestQueue {
    pub fn new(soft_capacity: usize, strict: bool) -> Self {
        Self {
            queue: VecDeque::with_capacity(soft_capacity.min(64)),
            soft_capacity,
            strict,
            overflowed: false,
        }
    }

    /// Append a request
    pub fn push(&mut self, request: HostRequest) {
        // A stop cancels any play of the same sound still waiting in the queue
        if let HostRequest::StopSound(sound) = request {
            self.queue
                .retain(|queued| *queued != HostRequest::PlaySound(sound));
        }

        self.queue.push_back(request);

        if self.queue.len() > self.soft_capacity && !self.overflowed {
            self.overflowed = true;
            log::error!(
                "Host request queue overflow: {} pending (capacity {})",
                self.queue.len(),
                self.soft_capacity
            );
            assert!(!self.strict, "host request queue overflow");
        }
    }

    /// Check if a sound is queued to start
    pub fn is_sound_queued(&self, sound: u32) -> bool {
        self.queue
            .iter()
            .any(|queued| *queued == HostRequest::PlaySound(sound))
    }

    /// Take every pending request in submission order
    pub fn drain(&mut self) -> Vec<HostRequest> {
        self.overflowed = false;
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.overflowed = false;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the soft capacity was exceeded since the last drain
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(256, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_creation() {
        let queue = RequestQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = RequestQueue::default();
        queue.push(HostRequest::LoadPalette(235));
        queue.push(HostRequest::PlaySound(3));

        assert_eq!(
            queue.drain(),
            vec![HostRequest::LoadPalette(235), HostRequest::PlaySound(3)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stop_cancels_queued_play() {
        let mut queue = RequestQueue::default();
        queue.push(HostRequest::PlaySound(3));
        assert!(queue.is_sound_queued(3));

        queue.push(HostRequest::StopSound(3));
        assert!(!queue.is_sound_queued(3));
        assert_eq!(queue.drain(), vec![HostRequest::StopSound(3)]);
    }

    #[test]
    fn test_overflow_grows_when_lenient() {
        let mut queue = RequestQueue::new(2, false);
        for sound in 0..5 {
            queue.push(HostRequest::PlaySound(sound));
        }

        assert_eq!(queue.len(), 5, "Requests must never be dropped");
        assert!(queue.has_overflowed());

        queue.drain();
        assert!(!queue.has_overflowed());
    }

    #[test]
    #[should_panic(expected = "host request queue overflow")]
    fn test_overflow_is_fatal_when_strict() {
        let mut queue = RequestQueue::new(1, true);
        queue.push(HostRequest::PlaySound(1));
        queue.push(HostRequest::PlaySound(2));
    }
}
