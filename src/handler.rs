use crate::command::Command;
use crate::status::KineticStatus;

/// The callback contract exposed to the upper layer, per `spec.md` §4.G. Both methods
/// consume `Box<Self>` rather than taking `&self`/`&mut self`: once a handler fires
/// there is no owned slot left to invoke it from a second time, so "invoked at most
/// once" is a property the type system enforces rather than a convention callers must
/// honor. Implementations that need interior state across the call should close over an
/// `Arc`/channel internally rather than holding `&mut self`.
pub trait Handler: Send {
    /// A successful response arrived and was matched to this handler's request.
    fn handle(self: Box<Self>, command: Command, value: Vec<u8>);

    /// This handler's request failed. `command` is `Some` only when a command was
    /// successfully parsed before the failure was detected (e.g. a missing
    /// `ack_sequence`); it is `None` for framing/I/O/shutdown failures.
    fn error(self: Box<Self>, status: KineticStatus, command: Option<Command>);
}
