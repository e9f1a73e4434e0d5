use crate::chunk::Chunk;

/// Simple free-list of chunks so the buffer doesn't allocate fresh memory every time it
/// rotates a fully-drained chunk out.
pub(crate) struct ChunkPool {
    pool: Vec<Chunk>,
}

impl ChunkPool {
    pub(crate) fn new() -> ChunkPool {
        ChunkPool { pool: Vec::new() }
    }

    /// Creates a new chunk if there are none available. Provides an existing one otherwise.
    pub(crate) fn alloc(&mut self) -> Chunk {
        self.pool.pop().unwrap_or_else(Chunk::new)
    }

    /// Reclaim the supplied chunk into the pool.
    pub(crate) fn reclaim(&mut self, chunk: Chunk) {
        self.pool.push(chunk)
    }
}
