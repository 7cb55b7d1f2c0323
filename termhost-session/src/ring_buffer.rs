use std::collections::VecDeque;

/// Default ring-buffer capacity for a session's raw output history.
pub const DEFAULT_RING_CAPACITY: usize = 65536;

/// Fixed-capacity byte ring buffer backing a session's `GetBufferedOutput`.
///
/// Pushing more bytes than `capacity` evicts the oldest bytes first. The
/// session's read loop is its only writer, so no internal locking is needed
/// here; callers serialize access themselves (behind the session's screen
/// lock).
pub struct RingBuffer {
    buf: VecDeque<u8>,
    capacity: usize,
}

impl RingBuffer {
    /// # Panics
    /// Panics if `capacity == 0`.
    #[must_use]
    pub fn new(capacity: usize) -> RingBuffer {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        RingBuffer { buf: VecDeque::with_capacity(capacity.min(65_536)), capacity }
    }

    /// Appends `data`, evicting the oldest bytes as needed. If `data` alone
    /// exceeds capacity, only its last `capacity` bytes are kept.
    pub fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        if data.len() >= self.capacity {
            self.buf.clear();
            let start = data.len() - self.capacity;
            self.buf.extend(&data[start..]);
            return;
        }

        let needed = self.buf.len() + data.len();
        if needed > self.capacity {
            self.buf.drain(..needed - self.capacity);
        }
        self.buf.extend(data);
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot copy of the buffered bytes in logical (oldest-first) order.
    #[must_use]
    pub fn to_array(&self) -> Vec<u8> {
        let (a, b) = self.buf.as_slices();
        let mut out = Vec::with_capacity(a.len() + b.len());
        out.extend_from_slice(a);
        out.extend_from_slice(b);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let rb = RingBuffer::new(16);
        assert!(rb.is_empty());
        assert_eq!(rb.length(), 0);
        assert!(rb.to_array().is_empty());
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = RingBuffer::new(0);
    }

    #[test]
    fn retains_tail_when_total_exceeds_capacity() {
        let mut rb = RingBuffer::new(4);
        rb.write(b"ab");
        rb.write(b"cdef");
        assert_eq!(rb.to_array(), b"cdef");
    }

    #[test]
    fn single_write_larger_than_capacity_keeps_only_the_tail() {
        let mut rb = RingBuffer::new(3);
        rb.write(b"abcdefgh");
        assert_eq!(rb.to_array(), b"fgh");
    }

    #[test]
    fn clear_empties_without_changing_capacity() {
        let mut rb = RingBuffer::new(8);
        rb.write(b"hello");
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 8);
    }
}
