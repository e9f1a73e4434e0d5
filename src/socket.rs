use std::io;
use std::os::fd::RawFd;

/// A non-blocking byte channel with a pollable descriptor, per `spec.md` §4.A. The core
/// never performs blocking I/O and never owns the readiness loop — it only needs `fd()`
/// so the host can hand it to `select`/`poll`/`epoll`, and `Read`/`Write` for the actual
/// transfer. TLS lifecycle is out of scope: an implementation wrapping an encrypted
/// stream just returns the underlying socket's descriptor here.
pub trait Socket: io::Read + io::Write {
    /// The descriptor the host event loop polls for readiness. Stable since Rust 1.66,
    /// which is why this crate doesn't need a `mio`-style `Evented`/`Source` layer of
    /// its own — the host already owns that.
    fn fd(&self) -> RawFd;
}
