use serde::{Deserialize, Serialize};

/// Header fields the receiver cares about. Real Kinetic commands carry a great deal
/// more (the command-builder API owns the rest); this crate only needs what framing and
/// dispatch depend on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandHeader {
    pub ack_sequence: Option<u64>,
    pub connection_id: Option<u64>,
}

/// Status the server attached to the command. `code` is carried as a plain string on
/// the wire since the full Kinetic status vocabulary is out of scope here; only the
/// presence of `ack_sequence`/`connection_id` drives this crate's logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandStatus {
    pub code: String,
}

/// The opaque-to-the-codec command payload deserialized from `Envelope::command_bytes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    #[serde(default)]
    pub header: CommandHeader,
    #[serde(default)]
    pub status: CommandStatus,
}

/// The command-level status code a real server reports on success; kept here so tests
/// and examples don't have to hand-build JSON for the common case.
pub const STATUS_SUCCESS: &str = "SUCCESS";
