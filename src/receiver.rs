use std::io;

use tracing::{debug, trace, warn};

use crate::buffer::Buffer;
use crate::command::Command;
use crate::config::ConnectionOptions;
use crate::envelope::{AuthType, Envelope};
use crate::error::DriveResult;
use crate::frame::FrameParser;
use crate::handler::Handler;
use crate::hmac::HmacProvider;
use crate::pending::{PendingEntry, PendingTable};
use crate::status::KineticStatus;

/// Owns the pending-response table, parses incoming frames, matches `ack_sequence` to
/// handlers, and dispatches success or error callbacks, per `spec.md` §4.E. Holds the
/// inbound half of the codec (`Buffer` + `FrameParser`) so a `WouldBlock` mid-frame
/// never loses buffered bytes.
pub(crate) struct Receiver {
    buffer: Buffer,
    parser: FrameParser,
    pending: PendingTable,
    hmac: HmacProvider,
    options: ConnectionOptions,
    connection_id: Option<u64>,
    fatal: bool,
    fatal_status: Option<KineticStatus>,
}

impl Receiver {
    pub(crate) fn new(options: ConnectionOptions) -> Receiver {
        let limits = options.frame_limits;
        Receiver {
            buffer: Buffer::new(),
            parser: FrameParser::new(limits),
            pending: PendingTable::new(),
            hmac: HmacProvider::new(),
            options,
            connection_id: None,
            fatal: false,
            fatal_status: None,
        }
    }

    /// Returns `false` without storing anything if `handler_key` is already pending.
    pub(crate) fn enqueue(&mut self, handler: Box<dyn Handler>, ack_sequence: u64, handler_key: u64) -> bool {
        self.pending.insert(handler_key, ack_sequence, handler)
    }

    /// Returns `true` iff the key was present and removed before its response arrived.
    pub(crate) fn remove(&mut self, handler_key: u64) -> bool {
        self.pending.remove(handler_key)
    }

    pub(crate) fn connection_id(&self) -> Option<u64> {
        self.connection_id
    }

    pub(crate) fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// The status a Service-level latch should surface for this receiver's fatal
    /// condition: the distinct `PROTOCOL_ERROR_RESPONSE_INVALID_FRAME` status (with the
    /// parse-failure detail in its message) when an envelope or command failed to
    /// deserialize, or `CLIENT_IO_ERROR` for every other fatal condition (framing error,
    /// genuine I/O error), per `spec.md` §8 scenario 4.
    pub(crate) fn take_fatal_status(&mut self) -> KineticStatus {
        self.fatal_status.take().unwrap_or_else(KineticStatus::client_io_error)
    }

    /// Drains every still-pending handler (used by the Service once a fatal error
    /// latches either half of the connection).
    pub(crate) fn drain_pending(&mut self) -> Vec<PendingEntry> {
        self.pending.drain()
    }

    /// Drains the socket through the codec, dispatching each complete frame. Returns
    /// `Idle` once the socket has no more data available and no partial frame is
    /// buffered; `IoWait` if the socket would block while a frame is still in flight;
    /// `Error` on any fatal condition (framing error, I/O error, socket closed
    /// mid-frame), latching the receiver.
    pub(crate) fn receive<R: io::Read>(&mut self, reader: &mut R) -> DriveResult {
        if self.fatal {
            return DriveResult::Error;
        }

        if let Err(err) = self.buffer.ingress(&mut *reader) {
            warn!(error = %err, "receiver latched after a fatal read error");
            self.fatal = true;
            return DriveResult::Error;
        }

        loop {
            match self.parser.poll(&mut self.buffer) {
                Ok(None) => break,
                Ok(Some(frame)) => {
                    trace!(message_bytes = frame.message_bytes.len(), value_bytes = frame.value_bytes.len(), "parsed complete frame");
                    if let Err(status) = self.dispatch(frame) {
                        warn!(status = %status, "receiver latched after a malformed envelope or command");
                        self.fatal = true;
                        self.fatal_status = Some(status);
                        return DriveResult::Error;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "receiver latched after a framing error");
                    self.fatal = true;
                    return DriveResult::Error;
                }
            }
        }

        if self.parser.is_awaiting_frame() {
            DriveResult::IoWait
        } else {
            DriveResult::Idle
        }
    }

    /// Handles one fully parsed frame. Returns `Err(KineticStatus)` for the fatal case
    /// (malformed envelope/command) — `PROTOCOL_ERROR_RESPONSE_INVALID_FRAME` carrying
    /// the parse-failure detail, per `spec.md` §4.E step 1 — which the Service then
    /// surfaces to every pending handler on both halves.
    fn dispatch(&mut self, frame: crate::frame::ParsedFrame) -> Result<(), KineticStatus> {
        let envelope = Envelope::from_bytes(&frame.message_bytes)
            .map_err(|err| KineticStatus::invalid_frame(format!("malformed envelope: {err}")))?;
        let command: Command = serde_json::from_slice(&envelope.command_bytes)
            .map_err(|err| KineticStatus::invalid_frame(format!("malformed command: {err}")))?;

        if let Some(connection_id) = command.header.connection_id {
            self.connection_id = Some(connection_id);
        }

        if envelope.auth_type == AuthType::Hmac {
            let verified = envelope
                .hmac_auth
                .as_ref()
                .and_then(|auth| self.options.key_for(auth.identity))
                .map(|key| self.hmac.verify(&envelope, key))
                .unwrap_or(false);

            if !verified {
                // Per-request, non-fatal: the connection keeps running. Dropped
                // silently if no pending handler matches the echoed ack_sequence.
                debug!(ack_sequence = ?command.header.ack_sequence, "hmac verification failed");
                if let Some(ack) = command.header.ack_sequence {
                    if let Some(entry) = self.pending.take_by_ack_sequence(ack) {
                        entry.handler.error(KineticStatus::hmac_mismatch(), Some(command));
                    }
                }
                return Ok(());
            }
        } else if envelope.auth_type == AuthType::UnsolicitedStatus {
            // connection_id already adopted above; never dispatched to a handler.
            return Ok(());
        }

        match command.header.ack_sequence {
            None => {
                // Dispatched to the oldest pending handler (spec.md §9 Open Question,
                // resolved in favor of the reference C++ client's behavior).
                if let Some(entry) = self.pending.take_oldest() {
                    entry.handler.error(KineticStatus::no_acksequence(), Some(command));
                }
            }
            Some(ack) => {
                if let Some(entry) = self.pending.take_by_ack_sequence(ack) {
                    trace!(handler_key = entry.handler_key, ack_sequence = ack, "dispatching response");
                    entry.handler.handle(command, frame.value_bytes);
                } else {
                    debug!(ack_sequence = ack, "response matched no pending handler, dropping");
                }
            }
        }

        Ok(())
    }
}

impl Drop for Receiver {
    /// Every still-pending handler is invoked with `CLIENT_SHUTDOWN "Receiver
    /// shutdown"` exactly once before the pending table is released, per `spec.md`
    /// §4.E/§5. A no-op if a fatal error already drained the table via
    /// `drain_pending`.
    fn drop(&mut self) {
        let remaining = self.pending.drain();
        if !remaining.is_empty() {
            debug!(count = remaining.len(), "notifying pending handlers of receiver shutdown");
        }
        for entry in remaining {
            entry.handler.error(KineticStatus::receiver_shutdown(), None);
        }
    }
}
