use std::io;
use thiserror::Error;

/// Internal plumbing error taxonomy for the frame codec. Mirrors the split the
/// teacher's networking stack draws between "would block, try again later" and
/// "connection is dead" (see `net::shared::NetworkError` in the teacher's server
/// workspace), one level below the public `KineticStatus` a `Handler` actually sees.
/// `Service::latch` always surfaces a fatal `CoreError` uniformly as `CLIENT_IO_ERROR`
/// (see `spec.md` §8 scenario 4 and `DESIGN.md`), so this type never itself carries a
/// `KineticStatus` conversion.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("framing error: {0}")]
    Framing(String),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub(crate) type CoreResult<T> = Result<T, CoreError>;

/// The three-state result every drive operation (`Sender::send`, `Receiver::receive`,
/// `Service::run`) reduces to, matching `spec.md`'s `{Idle, IoWait, Error}` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveResult {
    /// All queued work finished; the socket was not the limiting factor.
    Idle,
    /// The socket would have blocked; the host should wait for readiness before
    /// re-driving.
    IoWait,
    /// A fatal error occurred; the owning half is now latched.
    Error,
}
