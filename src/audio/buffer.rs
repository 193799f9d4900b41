//! Tail-retaining sample buffer for a single capture session.
//!
//! [`RecordingBuffer`] holds up to `capacity` `f32` PCM samples. Once full,
//! new samples overwrite the oldest ones, so a session that runs past the
//! configured maximum length keeps the most recent audio rather than the
//! start of it.
//!
//! # Example
//!
//! ```rust
//! use voice_assistant::audio::RecordingBuffer;
//!
//! let mut buf = RecordingBuffer::new(4);
//! buf.extend(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 samples, capacity 4
//! assert_eq!(buf.take(), vec![2.0, 3.0, 4.0, 5.0]); // oldest dropped
//! ```

// ---------------------------------------------------------------------------
// RecordingBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity circular sample buffer.
///
/// Never allocates beyond its initial capacity; overflow silently discards
/// the oldest samples.
pub struct RecordingBuffer {
    samples: Vec<f32>,
    capacity: usize,
    /// Next write index, wrapping at `capacity`.
    head: usize,
    /// Number of valid samples stored (≤ `capacity`).
    len: usize,
}

impl RecordingBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RecordingBuffer capacity must be > 0");
        Self {
            samples: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples on overflow.
    pub fn extend(&mut self, data: &[f32]) {
        for &sample in data {
            self.samples[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            }
        }
    }

    /// Remove and return all stored samples in chronological order.
    pub fn take(&mut self) -> Vec<f32> {
        if self.len == 0 {
            return Vec::new();
        }

        // Until the first overflow the oldest sample sits at index 0; after
        // that it sits at `head` (the slot the next write would claim).
        let start = if self.len < self.capacity {
            0
        } else {
            self.head
        };

        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            out.push(self.samples[(start + i) % self.capacity]);
        }

        self.clear();
        out
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
