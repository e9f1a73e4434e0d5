//! Non-blocking client-side packet service for the Kinetic storage protocol.
//!
//! Multiplexes many in-flight requests over a single stream socket, authenticates
//! framed messages with HMAC, correlates responses to requesters by sequence number,
//! and drives I/O through an externally owned readiness loop (`select`-style). See the
//! crate's design notes for the framing layout, the pending-request registry, and the
//! fail-stop semantics after the first I/O error.
//!
//! Out of scope: the higher-level Kinetic command-builder API, TLS handshake/lifecycle
//! (only an opaque non-blocking socket is required), the wire message schema beyond its
//! framing envelope, thread pools that drive the event loop, and configuration-file
//! parsing.

mod buffer;
mod chunk;
mod chunkpool;
mod command;
mod config;
mod envelope;
mod error;
mod frame;
mod handler;
mod hmac;
mod pending;
mod receiver;
mod sender;
mod service;
mod socket;
mod status;

pub use command::{Command, CommandHeader, CommandStatus, STATUS_SUCCESS};
pub use config::{ConnectionOptions, FrameLimits};
pub use envelope::{AuthType, Envelope, HmacAuth};
pub use handler::Handler;
pub use service::{FdSet, Service};
pub use socket::Socket;
pub use status::{KineticStatus, StatusCode};
