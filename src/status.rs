use std::fmt;

/// The fixed vocabulary of statuses the core surfaces to a `Handler`. Every other status
/// a real Kinetic deployment might report (capacity, version mismatch, etc.) belongs to
/// the higher-level command API, which is explicitly out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    ClientIoError,
    ClientResponseHmacVerificationError,
    ClientShutdown,
    ProtocolErrorResponseNoAcksequence,
    ProtocolErrorResponseInvalidFrame,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::ClientIoError => "CLIENT_IO_ERROR",
            StatusCode::ClientResponseHmacVerificationError => "CLIENT_RESPONSE_HMAC_VERIFICATION_ERROR",
            StatusCode::ClientShutdown => "CLIENT_SHUTDOWN",
            StatusCode::ProtocolErrorResponseNoAcksequence => "PROTOCOL_ERROR_RESPONSE_NO_ACKSEQUENCE",
            StatusCode::ProtocolErrorResponseInvalidFrame => "PROTOCOL_ERROR_RESPONSE_INVALID_FRAME",
        };
        f.write_str(name)
    }
}

/// What a `Handler::error` call actually receives: a fixed status plus the human-readable
/// message the reference test suite asserts verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KineticStatus {
    pub code: StatusCode,
    pub message: String,
}

impl KineticStatus {
    pub fn new(code: StatusCode, message: impl Into<String>) -> KineticStatus {
        KineticStatus { code, message: message.into() }
    }

    pub fn client_io_error() -> KineticStatus {
        KineticStatus::new(StatusCode::ClientIoError, "I/O read error")
    }

    pub fn hmac_mismatch() -> KineticStatus {
        KineticStatus::new(StatusCode::ClientResponseHmacVerificationError, "Response HMAC mismatch")
    }

    pub fn receiver_shutdown() -> KineticStatus {
        KineticStatus::new(StatusCode::ClientShutdown, "Receiver shutdown")
    }

    pub fn client_already_shut_down() -> KineticStatus {
        KineticStatus::new(StatusCode::ClientShutdown, "Client already shut down")
    }

    pub fn no_acksequence() -> KineticStatus {
        KineticStatus::new(StatusCode::ProtocolErrorResponseNoAcksequence, "Response had no acksequence")
    }

    pub fn invalid_frame(detail: impl Into<String>) -> KineticStatus {
        KineticStatus::new(StatusCode::ProtocolErrorResponseInvalidFrame, detail.into())
    }
}

impl fmt::Display for KineticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
