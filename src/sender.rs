use std::collections::{HashSet, VecDeque};
use std::io;

use tracing::{debug, trace, warn};

use crate::error::DriveResult;
use crate::frame;
use crate::handler::Handler;

struct QueuedRequest {
    handler_key: u64,
    ack_sequence: u64,
    frame: Vec<u8>,
    written: usize,
    handler: Box<dyn Handler>,
}

/// Owns the outbound queue and writes frames to the socket under `WouldBlock`
/// semantics, per `spec.md` §4.D. A request keeps its handler here — not in the
/// Receiver's pending table — until its frame has been fully written to the wire; only
/// then is it handed off (see `Sender::take_committed`). This is what makes
/// `Service::remove` correct as specified ("try Sender first; if Sender removed,
/// done."): while a request is still queued, the Sender is its sole owner, so removing
/// it there is enough to guarantee the handler is never invoked.
pub(crate) struct Sender {
    queue: VecDeque<QueuedRequest>,
    queued_keys: HashSet<u64>,
    committed: Vec<QueuedRequest>,
    fatal: bool,
}

impl Sender {
    pub(crate) fn new() -> Sender {
        Sender {
            queue: VecDeque::new(),
            queued_keys: HashSet::new(),
            committed: Vec::new(),
            fatal: false,
        }
    }

    /// Appends to the tail of the outbound queue. Returns `false` without storing
    /// anything if `handler_key` is already queued.
    pub(crate) fn submit(
        &mut self,
        handler_key: u64,
        ack_sequence: u64,
        envelope_bytes: &[u8],
        value_bytes: &[u8],
        handler: Box<dyn Handler>,
    ) -> bool {
        if self.queued_keys.contains(&handler_key) {
            return false;
        }

        let frame = frame::encode(envelope_bytes, value_bytes);
        trace!(handler_key, ack_sequence, bytes = frame.len(), "queued outbound request");
        self.queued_keys.insert(handler_key);
        self.queue.push_back(QueuedRequest { handler_key, ack_sequence, frame, written: 0, handler });
        true
    }

    /// Returns `true` iff the request was still queued and not yet (even partially)
    /// written to the wire, and removed; its handler is neither invoked nor retained.
    /// A request whose first byte has already hit the wire can't be cancelled —
    /// dropping the rest of it would desynchronize the framing for every frame after
    /// it, so only requests behind the head of the queue are ever eligible.
    pub(crate) fn remove(&mut self, handler_key: u64) -> bool {
        let Some(pos) = self.queue.iter().position(|entry| entry.handler_key == handler_key) else {
            return false;
        };

        if pos == 0 && self.queue[0].written > 0 {
            return false;
        }

        self.queue.remove(pos);
        self.queued_keys.remove(&handler_key);
        trace!(handler_key, "cancelled before transmission");
        true
    }

    /// Drives writes until the queue drains (`Idle`) or the socket would block
    /// (`IoWait`). A partially written frame is remembered byte-for-byte across calls;
    /// the next call resumes at the exact offset.
    pub(crate) fn send<W: io::Write>(&mut self, writer: &mut W) -> DriveResult {
        if self.fatal {
            return DriveResult::Error;
        }

        loop {
            let Some(front) = self.queue.front_mut() else {
                return DriveResult::Idle;
            };

            match writer.write(&front.frame[front.written..]) {
                Ok(0) => return DriveResult::IoWait,
                Ok(n) => {
                    front.written += n;

                    if front.written >= front.frame.len() {
                        let entry = self.queue.pop_front().expect("front entry just written");
                        trace!(handler_key = entry.handler_key, "request committed to the wire");
                        self.queued_keys.remove(&entry.handler_key);
                        self.committed.push(entry);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return DriveResult::IoWait,
                Err(e) => {
                    warn!(error = %e, "sender latched after a fatal write error");
                    self.fatal = true;
                    return DriveResult::Error;
                }
            }
        }
    }

    /// Takes ownership of every request fully written to the wire since the last call,
    /// so the Service can hand each one off to the Receiver's pending table.
    pub(crate) fn take_committed(&mut self) -> Vec<(u64, u64, Box<dyn Handler>)> {
        std::mem::take(&mut self.committed)
            .into_iter()
            .map(|entry| (entry.handler_key, entry.ack_sequence, entry.handler))
            .collect()
    }

    /// Drains every handler still sitting in the queue (used once a fatal error
    /// latches the Sender, so the Service can surface it to each of them).
    pub(crate) fn drain(&mut self) -> Vec<Box<dyn Handler>> {
        let handlers: Vec<_> = self.queue.drain(..).map(|entry| entry.handler).collect();
        if !handlers.is_empty() {
            debug!(count = handlers.len(), "draining still-queued handlers after fatal error");
        }
        handlers
    }

    pub(crate) fn is_fatal(&self) -> bool {
        self.fatal
    }
}
