/// Ring buffer holding the most recent mono samples for display
///
/// Decouples display framing from callback framing: callbacks of any size go
/// in, the scope view pulls the latest frame out.
pub struct ScopeBuffer {
    buffer: Vec<f32>,
    capacity: usize,
}

impl ScopeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Push mono samples, discarding the oldest past capacity
    pub fn push(&mut self, data: &[f32]) {
        self.buffer.extend_from_slice(data);

        // Keep only the most recent samples
        if self.buffer.len() > self.capacity {
            let excess = self.buffer.len() - self.capacity;
            self.buffer.drain(0..excess);
        }
    }

    /// Get latest N samples in chronological order (oldest to newest)
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let len = self.buffer.len().min(count);
        if len == 0 {
            return Vec::new();
        }

        let start = self.buffer.len() - len;
        self.buffer[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_returns_newest_in_order() {
        let mut buffer = ScopeBuffer::new(8);
        buffer.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.latest(2), vec![3.0, 4.0]);
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut buffer = ScopeBuffer::new(4);
        buffer.push(&[1.0, 2.0, 3.0, 4.0]);
        buffer.push(&[5.0, 6.0]);

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.latest(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_latest_on_short_buffer() {
        let mut buffer = ScopeBuffer::new(16);
        buffer.push(&[1.0]);
        assert_eq!(buffer.latest(8), vec![1.0]);
        assert!(ScopeBuffer::new(16).latest(8).is_empty());
    }
}
