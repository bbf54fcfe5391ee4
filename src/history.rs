//! Telemetry sample rings for Triphase
//!
//! Fixed-capacity circular buffers of int16 samples backing the UI history
//! endpoints. Rings are pre-filled with a sentinel so an export always has
//! the full window of entries; samples that predate boot render as `null`.

use serde_json::Value;

/// Window covered by each ring, hours.
pub const HISTORY_HOURS: usize = 12;

/// Sampling cadence, minutes.
pub const HISTORY_MINUTE_INTERVAL: usize = 1;

/// Ring capacity: one sample per minute over the window, plus the sample
/// currently being displaced.
pub const RING_CAPACITY: usize = HISTORY_HOURS * (60 / HISTORY_MINUTE_INTERVAL) + 1;

/// Sentinel for "unknown / pre-boot"; exported as `null`.
pub const SAMPLE_UNKNOWN: i16 = -1;

/// Fixed-capacity ring of int16 samples.
///
/// Always full: `new()` seeds every slot with [`SAMPLE_UNKNOWN`] and `push`
/// replaces the oldest sample in O(1). Iteration and export are oldest-first.
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: Vec<i16>,
    /// Index of the oldest sample, which is also the next slot overwritten.
    head: usize,
}

impl SampleRing {
    pub fn new() -> Self {
        Self {
            samples: vec![SAMPLE_UNKNOWN; RING_CAPACITY],
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Append a sample, displacing the oldest.
    pub fn push(&mut self, value: i16) {
        self.samples[self.head] = value;
        self.head = (self.head + 1) % self.samples.len();
    }

    /// Samples oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = i16> + '_ {
        let (tail, front) = self.samples.split_at(self.head);
        front.iter().chain(tail.iter()).copied()
    }

    /// Export as a JSON array with `null` substituted for sentinel samples,
    /// oldest-first.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.iter()
                .map(|v| {
                    if v < 0 {
                        Value::Null
                    } else {
                        Value::from(v)
                    }
                })
                .collect(),
        )
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ring_is_prefilled_with_sentinel() {
        let ring = SampleRing::new();
        assert_eq!(ring.capacity(), 721);
        assert!(ring.iter().all(|v| v == SAMPLE_UNKNOWN));
        let json = ring.to_json();
        let arr = json.as_array().unwrap();
        assert_eq!(arr.len(), 721);
        assert!(arr.iter().all(|v| v.is_null()));
    }

    #[test]
    fn push_displaces_oldest() {
        let mut ring = SampleRing::new();
        ring.push(100);
        ring.push(200);
        let values: Vec<i16> = ring.iter().collect();
        assert_eq!(values.len(), 721);
        // Oldest-first: sentinels, then the two pushed samples
        assert_eq!(values[718], SAMPLE_UNKNOWN);
        assert_eq!(values[719], 100);
        assert_eq!(values[720], 200);
    }

    #[test]
    fn wraps_after_capacity_pushes() {
        let mut ring = SampleRing::new();
        for i in 0..(RING_CAPACITY as i16 + 5) {
            ring.push(i);
        }
        let values: Vec<i16> = ring.iter().collect();
        assert_eq!(values[0], 5);
        assert_eq!(values[720], RING_CAPACITY as i16 + 4);
    }

    #[test]
    fn json_maps_negatives_to_null() {
        let mut ring = SampleRing::new();
        ring.push(-1);
        ring.push(0);
        ring.push(4140);
        let json = ring.to_json();
        let arr = json.as_array().unwrap();
        assert!(arr[718].is_null());
        assert_eq!(arr[719], Value::from(0));
        assert_eq!(arr[720], Value::from(4140));
    }
}
