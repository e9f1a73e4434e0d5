use std::collections::HashSet;
use std::os::fd::RawFd;

use tracing::{debug, warn};

use crate::config::ConnectionOptions;
use crate::envelope::Envelope;
use crate::error::DriveResult;
use crate::handler::Handler;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::socket::Socket;
use crate::status::KineticStatus;

/// A minimal stand-in for a C `fd_set`: the set of descriptors a host `select`-style
/// loop should poll for a given direction of readiness, per `spec.md` §6. Kept as a
/// plain `RawFd` collection rather than a real `libc::fd_set` so this crate never needs
/// an `unsafe` FFI dependency just to report readiness — a host loop using `poll`/
/// `epoll`/`mio` can iterate `fds()` just as easily as one using `select(2)`.
#[derive(Debug, Default, Clone)]
pub struct FdSet {
    fds: HashSet<RawFd>,
}

impl FdSet {
    pub fn new() -> FdSet {
        FdSet { fds: HashSet::new() }
    }

    pub fn insert(&mut self, fd: RawFd) {
        self.fds.insert(fd);
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.fds.contains(&fd)
    }

    pub fn clear(&mut self) {
        self.fds.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawFd> {
        self.fds.iter()
    }
}

/// Composes a Sender and a Receiver over one `Socket`, drives them once per
/// event-loop tick, surfaces read/write readiness to the host, and enforces
/// fail-stop behavior after the first fatal error, per `spec.md` §4.F.
pub struct Service<S: Socket> {
    socket: S,
    sender: Sender,
    receiver: Receiver,
    next_handler_key: u64,
    latched: bool,
}

impl<S: Socket> Service<S> {
    pub fn new(socket: S, options: ConnectionOptions) -> Service<S> {
        Service {
            socket,
            sender: Sender::new(),
            receiver: Receiver::new(options),
            next_handler_key: 0,
            latched: false,
        }
    }

    /// The descriptor the host event loop should poll. Exposed separately from
    /// `run`'s fd-set output so a host can register it once up front.
    pub fn fd(&self) -> RawFd {
        self.socket.fd()
    }

    /// The connection id most recently supplied by the server, adopted from any
    /// inbound command header (including unsolicited status frames). Zero until the
    /// first such frame arrives, per `spec.md` §3.
    pub fn connection_id(&self) -> u64 {
        self.receiver.connection_id().unwrap_or(0)
    }

    pub fn is_shutdown(&self) -> bool {
        self.latched
    }

    /// Submits a request. If the connection is already latched in a fatal or shutdown
    /// state, `handler` is invoked synchronously with `CLIENT_SHUTDOWN "Client already
    /// shut down"` and discarded; otherwise a freshly allocated `handler_key` is
    /// returned and the request is queued on the Sender (handed off to the Receiver's
    /// pending table once its frame is fully committed to the wire, see `sender.rs`).
    ///
    /// `ack_sequence` is the correlator the caller has already baked into
    /// `envelope`'s opaque `command_bytes` — the core only needs to know its value to
    /// register the pending response, not to interpret the rest of the command, which
    /// belongs to the out-of-scope command-builder API (`spec.md` §1).
    pub fn submit(
        &mut self,
        envelope: Envelope,
        ack_sequence: u64,
        value: Vec<u8>,
        handler: Box<dyn Handler>,
    ) -> u64 {
        let handler_key = self.allocate_handler_key();

        if self.latched {
            debug!(handler_key, "rejecting submit on a shut-down connection");
            handler.error(KineticStatus::client_already_shut_down(), None);
            return handler_key;
        }

        let envelope_bytes = envelope.to_bytes();
        let accepted = self.sender.submit(handler_key, ack_sequence, &envelope_bytes, &value, handler);
        debug_assert!(accepted, "a freshly allocated handler_key can't collide");
        handler_key
    }

    /// Tries the Sender first (the request hasn't hit the wire yet); if that misses,
    /// tries the Receiver (the request is already awaiting a response). Returns the
    /// logical OR, per `spec.md` §4.F.
    pub fn remove(&mut self, handler_key: u64) -> bool {
        if self.latched {
            return false;
        }

        if self.sender.remove(handler_key) {
            return true;
        }

        self.receiver.remove(handler_key)
    }

    /// One event-loop tick. Drives the Sender, then the Receiver — in that order, so a
    /// handler that synchronously resubmits a new request from inside its own callback
    /// never has that request go out on the same tick. Populates `read_fds`/`write_fds`
    /// and `nfds` on success; returns `false` (without touching the socket again) once
    /// latched.
    pub fn run(&mut self, read_fds: &mut FdSet, write_fds: &mut FdSet, nfds: &mut RawFd) -> bool {
        if self.latched {
            return false;
        }

        let send_result = self.sender.send(&mut self.socket);

        // A request can commit to the wire even if the send() call that follows it
        // fails, so hand off every newly committed request before inspecting the
        // result.
        for (handler_key, ack_sequence, handler) in self.sender.take_committed() {
            self.receiver.enqueue(handler, ack_sequence, handler_key);
        }

        if send_result == DriveResult::Error {
            self.latch(KineticStatus::client_io_error());
            return false;
        }

        let receive_result = self.receiver.receive(&mut self.socket);

        if receive_result == DriveResult::Error {
            let status = self.receiver.take_fatal_status();
            self.latch(status);
            return false;
        }

        let fd = self.socket.fd();

        if receive_result == DriveResult::IoWait {
            read_fds.insert(fd);
        }

        if send_result == DriveResult::IoWait {
            write_fds.insert(fd);
        }

        *nfds = fd + 1;
        true
    }

    /// Latches the connection and fails every still-pending handler on both halves with
    /// `status`. A Sender-originated fatal condition (genuine write I/O error) and a
    /// Receiver framing/I/O failure both surface as `CLIENT_IO_ERROR "I/O read error"`,
    /// per `spec.md` §8 scenario 4 (even a framing error, like an invalid magic byte, is
    /// reported uniformly that way). A malformed envelope/command is the one fatal
    /// Receiver condition with its own distinct status, `PROTOCOL_ERROR_RESPONSE_INVALID_FRAME`
    /// carrying the parse-failure detail, per `spec.md` §4.E step 1 — see
    /// `Receiver::take_fatal_status`, which is where that distinction is made. The
    /// per-request statuses (HMAC mismatch, missing ack_sequence) are never used here;
    /// those stay on the non-fatal path inside the Receiver itself.
    fn latch(&mut self, status: KineticStatus) {
        warn!(fd = self.socket.fd(), status = %status, "latching connection after a fatal error");
        self.latched = true;

        for handler in self.sender.drain() {
            handler.error(status.clone(), None);
        }

        for entry in self.receiver.drain_pending() {
            entry.handler.error(status.clone(), None);
        }
    }

    fn allocate_handler_key(&mut self) -> u64 {
        let key = self.next_handler_key;
        self.next_handler_key += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandHeader, CommandStatus, STATUS_SUCCESS};
    use crate::envelope::Envelope;
    use crate::frame;
    use crate::hmac::HmacProvider;
    use std::collections::VecDeque;
    use std::io;
    use std::os::fd::RawFd;
    use std::sync::mpsc::{channel, Receiver as MpscReceiver, Sender as MpscSender};

    enum Event {
        Handle(Command, Vec<u8>),
        Error(KineticStatus, Option<Command>),
    }

    struct RecordingHandler(MpscSender<Event>);

    impl Handler for RecordingHandler {
        fn handle(self: Box<Self>, command: Command, value: Vec<u8>) {
            let _ = self.0.send(Event::Handle(command, value));
        }

        fn error(self: Box<Self>, status: KineticStatus, command: Option<Command>) {
            let _ = self.0.send(Event::Error(status, command));
        }
    }

    fn handler() -> (Box<dyn Handler>, MpscReceiver<Event>) {
        let (tx, rx) = channel();
        (Box::new(RecordingHandler(tx)), rx)
    }

    /// An in-memory, non-blocking socket: a byte queue for egress and a preloaded byte
    /// queue for ingress, each returning `WouldBlock` once exhausted rather than
    /// blocking — the same contract a real non-blocking `TcpStream` offers.
    struct MockSocket {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        write_blocked: bool,
    }

    impl MockSocket {
        fn new() -> MockSocket {
            MockSocket { inbound: VecDeque::new(), outbound: Vec::new(), write_blocked: false }
        }

        fn push_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes);
        }
    }

    impl io::Read for MockSocket {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inbound.is_empty() {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let mut n = 0;
            while n < buf.len() {
                match self.inbound.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl io::Write for MockSocket {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.write_blocked {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Socket for MockSocket {
        fn fd(&self) -> RawFd {
            7
        }
    }

    fn success_command(ack_sequence: u64) -> Vec<u8> {
        serde_json::to_vec(&Command {
            header: CommandHeader { ack_sequence: Some(ack_sequence), connection_id: None },
            status: CommandStatus { code: STATUS_SUCCESS.to_string() },
        })
        .unwrap()
    }

    fn hmac_response(identity: u64, key: &[u8], ack_sequence: u64, value: &[u8]) -> Vec<u8> {
        let mut envelope = Envelope::hmac(identity, success_command(ack_sequence));
        let mac = HmacProvider::new().compute(&envelope, key);
        envelope.hmac_auth.as_mut().unwrap().hmac = mac;
        frame::encode(&envelope.to_bytes(), value)
    }

    #[test]
    fn test_submit_then_run_round_trips_a_response() {
        let socket = MockSocket::new();
        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));

        let (h, rx) = handler();
        let envelope = Envelope::hmac(3, success_command(33));
        let key = service.submit(envelope, 33, b"payload".to_vec(), h);
        assert_eq!(key, 0);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;
        assert!(service.run(&mut read_fds, &mut write_fds, &mut nfds));

        // The request was written to the wire; feed back a matching response.
        let response = hmac_response(3, b"key", 33, b"value");
        service.socket.push_inbound(&response);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        assert!(service.run(&mut read_fds, &mut write_fds, &mut nfds));

        match rx.try_recv().unwrap() {
            Event::Handle(command, value) => {
                assert_eq!(command.header.ack_sequence, Some(33));
                assert_eq!(value, b"value");
            }
            Event::Error(..) => panic!("expected handle"),
        }
    }

    #[test]
    fn test_readiness_reflects_write_blocked_socket() {
        let mut socket = MockSocket::new();
        socket.write_blocked = true;
        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));

        let (h, _rx) = handler();
        let envelope = Envelope::hmac(3, success_command(33));
        service.submit(envelope, 33, b"payload".to_vec(), h);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;
        assert!(service.run(&mut read_fds, &mut write_fds, &mut nfds));

        assert!(write_fds.contains(7));
        assert!(!read_fds.contains(7));
        assert_eq!(nfds, 8);
    }

    #[test]
    fn test_invalid_magic_latches_and_fails_pending_handlers_with_io_error() {
        let mut socket = MockSocket::new();
        socket.push_inbound(&[b'E']);
        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));

        let (h1, rx1) = handler();
        let (h2, rx2) = handler();
        service.submit(Envelope::hmac(3, success_command(33)), 33, vec![], h1);
        service.submit(Envelope::hmac(3, success_command(44)), 44, vec![], h2);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;

        // First tick commits both frames to the wire and reads the bad magic byte.
        assert!(!service.run(&mut read_fds, &mut write_fds, &mut nfds));
        assert!(service.is_shutdown());

        for rx in [rx1, rx2] {
            match rx.try_recv().unwrap() {
                Event::Error(status, _) => assert_eq!(status, KineticStatus::client_io_error()),
                Event::Handle(..) => panic!("expected io error"),
            }
        }

        // Every subsequent call short-circuits without touching the socket.
        let (h3, rx3) = handler();
        let key = service.submit(Envelope::hmac(3, success_command(55)), 55, vec![], h3);
        match rx3.try_recv().unwrap() {
            Event::Error(status, _) => assert_eq!(status, KineticStatus::client_already_shut_down()),
            Event::Handle(..) => panic!("expected shutdown error"),
        }
        assert!(!service.remove(key));
        assert!(!service.run(&mut FdSet::new(), &mut FdSet::new(), &mut nfds));
    }

    #[test]
    fn test_malformed_envelope_latches_with_invalid_frame_status() {
        let mut socket = MockSocket::new();
        socket.push_inbound(&frame::encode(b"not an envelope", b""));
        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));

        let (h, rx) = handler();
        service.submit(Envelope::hmac(3, success_command(33)), 33, vec![], h);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;
        assert!(!service.run(&mut read_fds, &mut write_fds, &mut nfds));
        assert!(service.is_shutdown());

        match rx.try_recv().unwrap() {
            Event::Error(status, _) => {
                assert_eq!(status.code, crate::status::StatusCode::ProtocolErrorResponseInvalidFrame);
                assert!(status.message.contains("malformed envelope"));
            }
            Event::Handle(..) => panic!("expected invalid-frame error"),
        }
    }

    #[test]
    fn test_remove_before_commit_cancels_without_invoking_handler() {
        let socket = MockSocket::new();
        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));

        let (h, rx) = handler();
        let key = service.submit(Envelope::hmac(3, success_command(33)), 33, vec![], h);

        assert!(service.remove(key));
        assert!(rx.try_recv().is_err());

        // The frame never goes out, so a subsequent run() tick has nothing to do.
        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;
        assert!(service.run(&mut read_fds, &mut write_fds, &mut nfds));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_connection_id_adopted_from_unsolicited_status_frame() {
        let mut socket = MockSocket::new();
        let envelope = Envelope::unsolicited(
            serde_json::to_vec(&Command {
                header: CommandHeader { ack_sequence: None, connection_id: Some(42) },
                status: CommandStatus::default(),
            })
            .unwrap(),
        );
        socket.push_inbound(&frame::encode(&envelope.to_bytes(), b""));

        let mut service = Service::new(socket, ConnectionOptions::single(3, b"key".to_vec()));
        assert_eq!(service.connection_id(), 0);

        let mut read_fds = FdSet::new();
        let mut write_fds = FdSet::new();
        let mut nfds = 0;
        assert!(service.run(&mut read_fds, &mut write_fds, &mut nfds));

        assert_eq!(service.connection_id(), 42);
    }
}
