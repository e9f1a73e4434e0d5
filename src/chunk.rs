pub(crate) const CHUNK_SIZE: usize = 8192;

/// A linear byte memory block. Reading from the chunk advances the start cursor, while
/// writing to it advances the end cursor. When the start cursor catches up with the end
/// cursor, the chunk is considered empty and both cursors reset to zero.
pub(crate) struct Chunk {
    data: Box<[u8; CHUNK_SIZE]>,
    start: usize,
    end: usize,
}

impl Chunk {
    #[inline]
    pub(crate) fn new() -> Chunk {
        Chunk {
            data: Box::new([0; CHUNK_SIZE]),
            start: 0,
            end: 0,
        }
    }

    /// Free capacity remaining in the chunk.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        CHUNK_SIZE - self.end
    }

    /// Amount of unread data currently buffered in the chunk.
    #[inline]
    pub(crate) fn remaining_data(&self) -> usize {
        self.end - self.start
    }

    /// Advance the start cursor, as if `count` bytes were read out.
    #[inline]
    pub(crate) fn advance(&mut self, count: usize) {
        self.validate_advance(count);
        self.start += count;
        self.check_clear();
    }

    /// Advance the end cursor, as if `count` bytes were written in.
    #[inline]
    pub(crate) fn expand(&mut self, count: usize) {
        let new_end = self.end + count;

        if new_end > CHUNK_SIZE {
            panic!("Attempted to expand beyond chunk size")
        }

        self.end = new_end;
    }

    /// Slice of the readable part of the chunk.
    #[inline]
    pub(crate) fn readable_slice(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    /// Slice of the writeable part of the chunk.
    #[inline]
    pub(crate) fn writeable_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.end..CHUNK_SIZE]
    }

    #[inline]
    fn check_clear(&mut self) {
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    #[inline]
    fn validate_advance(&self, count: usize) {
        if self.start + count > self.end {
            panic!("Attempted to advance past chunk edge")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chunk() {
        let chunk = Chunk::new();

        assert_eq!(chunk.data.len(), CHUNK_SIZE);
        assert_eq!(chunk.start, 0);
        assert_eq!(chunk.end, 0);
    }

    #[test]
    fn test_capacity() {
        let mut chunk = Chunk::new();

        assert_eq!(chunk.capacity(), CHUNK_SIZE);
        chunk.end = 1000;
        assert_eq!(chunk.capacity(), CHUNK_SIZE - 1000)
    }

    #[test]
    fn test_remaining_data() {
        let mut chunk = Chunk::new();

        assert_eq!(chunk.remaining_data(), 0);
        chunk.end = 1000;
        assert_eq!(chunk.remaining_data(), 1000);
    }

    #[test]
    fn test_advance() {
        let mut chunk = Chunk::new();
        chunk.end = 5;

        chunk.advance(2);
        assert_eq!(chunk.start, 2);
        assert_eq!(chunk.end, 5);

        chunk.advance(3);
        assert_eq!(chunk.start, 0);
        assert_eq!(chunk.end, 0);
    }

    #[test]
    #[should_panic(expected = "Attempted to advance past chunk edge")]
    fn test_advance_past_end_fails() {
        let mut chunk = Chunk::new();
        chunk.end = 5;
        chunk.advance(6);
    }

    #[test]
    fn test_expand() {
        let mut chunk = Chunk::new();
        chunk.expand(5);
        assert_eq!(chunk.start, 0);
        assert_eq!(chunk.end, 5);
    }

    #[test]
    #[should_panic(expected = "Attempted to expand beyond chunk size")]
    fn test_expand_past_chunk_size_fails() {
        let mut chunk = Chunk::new();
        chunk.expand(CHUNK_SIZE + 1);
    }

    #[test]
    fn test_readable_and_writeable_slice() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.readable_slice(), Vec::<u8>::new().as_slice());
        assert_eq!(chunk.writeable_slice().len(), CHUNK_SIZE);

        chunk.writeable_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        chunk.expand(4);

        assert_eq!(chunk.readable_slice(), &[1, 2, 3, 4]);
        assert_eq!(chunk.writeable_slice().len(), CHUNK_SIZE - 4);
    }
}
