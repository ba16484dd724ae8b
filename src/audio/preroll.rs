use std::collections::VecDeque;

/// Sliding window of the most recent raw PCM bytes.
///
/// Receives every captured frame unconditionally so that the moment speech is
/// detected, the segment can be backfilled with the audio that preceded the
/// onset (otherwise the first syllable of an utterance gets clipped).
/// Bounded: appends beyond capacity evict the oldest bytes, never grow.
pub struct PreRollBuffer {
    data: VecDeque<u8>,
    capacity: usize,
}

impl PreRollBuffer {
    /// Create a buffer retaining `seconds` of audio at the given byte rate.
    pub fn new(seconds: f32, bytes_per_second: usize) -> Self {
        let capacity = (seconds * bytes_per_second as f32) as usize;
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a chunk, evicting the oldest bytes if capacity is exceeded.
    pub fn add(&mut self, chunk: &[u8]) {
        self.data.extend(chunk.iter().copied());
        if self.data.len() > self.capacity {
            let excess = self.data.len() - self.capacity;
            self.data.drain(..excess);
        }
    }

    /// Copy out the current contents (oldest byte first). Does not mutate.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
