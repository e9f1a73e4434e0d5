use crate::chunk::Chunk;
use crate::chunkpool::ChunkPool;
use std::collections::VecDeque;
use std::io;

/// A dynamically sized, double ended, chunked FIFO byte queue. Data is appended at the
/// tail and consumed from the head. Used both as the outbound egress buffer (Sender) and
/// the inbound ingress buffer (Receiver parsing), so that a socket returning `WouldBlock`
/// mid-frame never loses or reshuffles already-buffered bytes.
pub(crate) struct Buffer {
    chunks: VecDeque<Chunk>,
    pool: ChunkPool,
}

impl Buffer {
    #[inline]
    pub(crate) fn new() -> Buffer {
        let mut chunks = VecDeque::new();
        chunks.push_back(Chunk::new());
        Buffer {
            chunks,
            pool: ChunkPool::new(),
        }
    }

    /// Total number of unread bytes currently buffered.
    pub(crate) fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::remaining_data).sum()
    }

    /// Pull exactly `count` bytes off the head of the buffer. Non-destructive unless the
    /// full amount is available: returns `None` and leaves the buffer untouched if there
    /// isn't yet enough data, so a resumed frame-parse never has to rewind.
    pub(crate) fn take(&mut self, count: usize) -> Option<Vec<u8>> {
        if self.len() < count {
            return None;
        }

        let mut out = Vec::with_capacity(count);

        while out.len() < count {
            let chunk = self.chunks.front_mut().expect("buffer invariant: at least one chunk");
            let need = count - out.len();
            let take = need.min(chunk.remaining_data());
            out.extend_from_slice(&chunk.readable_slice()[..take]);
            chunk.advance(take);

            if chunk.remaining_data() == 0 && self.chunks.len() > 1 {
                self.pool.reclaim(self.chunks.pop_front().unwrap());
            }
        }

        Some(out)
    }

    /// Write the data from the buffer to the supplied writer. Returns the number of bytes
    /// written once the buffer is drained or the next write would block.
    pub(crate) fn egress<W: io::Write>(&mut self, mut writer: W) -> io::Result<usize> {
        let mut total_count = 0usize;

        loop {
            match self.write(&mut writer) {
                Ok(write_count) => {
                    total_count += write_count;

                    if self.chunks.len() > 1 {
                        self.pool.reclaim(self.chunks.pop_front().unwrap());
                    } else {
                        return Ok(total_count);
                    }
                }
                Err(e) => {
                    if e.kind() == io::ErrorKind::WouldBlock {
                        return Ok(total_count);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Read data from the reader into the buffer. Returns the number of bytes read once
    /// all available data has been consumed and the next read would block.
    pub(crate) fn ingress<R: io::Read>(&mut self, mut reader: R) -> io::Result<usize> {
        let mut total_count = 0usize;

        loop {
            match self.read(&mut reader) {
                Ok(read_count) => {
                    total_count += read_count;
                    self.chunks.push_back(self.pool.alloc());
                }
                Err(e) => {
                    if e.kind() == io::ErrorKind::WouldBlock {
                        return Ok(total_count);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    #[inline]
    fn write<W: io::Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        let mut total_count = 0usize;
        let chunk = self.chunks.front_mut().unwrap();

        loop {
            let write_count = writer.write(chunk.readable_slice())?;
            total_count += write_count;

            if write_count == 0 && chunk.remaining_data() > 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }

            chunk.advance(write_count);

            if chunk.remaining_data() == 0 {
                return Ok(total_count);
            }
        }
    }

    #[inline]
    fn read<R: io::Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let mut total_count = 0usize;
        let chunk = self.chunks.back_mut().unwrap();

        loop {
            let read_count = reader.read(chunk.writeable_slice())?;
            total_count += read_count;

            // Per the `io::Read` contract, `Ok(0)` with spare capacity in the
            // destination means the peer closed the stream, not "no data right
            // now" (which non-blocking sockets signal via `Err(WouldBlock)`).
            // Keep the two distinguishable so the receiver can treat a closed
            // socket as fatal instead of looping on a phantom `WouldBlock`.
            if read_count == 0 && chunk.capacity() > 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }

            chunk.expand(read_count);

            if chunk.capacity() == 0 {
                return Ok(total_count);
            }
        }
    }
}
