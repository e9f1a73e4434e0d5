use serde::{Deserialize, Serialize};

/// How the envelope's authenticity is established. `Pin` is carried through per
/// `spec.md` §3 but this crate (like the command-builder API it plugs into) has no PIN
/// verification logic of its own to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    Hmac,
    UnsolicitedStatus,
    Pin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HmacAuth {
    pub identity: u64,
    #[serde(default)]
    pub hmac: Vec<u8>,
}

/// The authenticated wrapper carried inside a frame's `message_bytes`. Opaque to the
/// frame codec; only the Receiver (and, for outbound frames, the HMAC provider) look
/// inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub auth_type: AuthType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hmac_auth: Option<HmacAuth>,
    pub command_bytes: Vec<u8>,
}

impl Envelope {
    pub fn unsolicited(command_bytes: Vec<u8>) -> Envelope {
        Envelope { auth_type: AuthType::UnsolicitedStatus, hmac_auth: None, command_bytes }
    }

    pub fn hmac(identity: u64, command_bytes: Vec<u8>) -> Envelope {
        Envelope {
            auth_type: AuthType::Hmac,
            hmac_auth: Some(HmacAuth { identity, hmac: Vec::new() }),
            command_bytes,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Envelope serialization is infallible")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Envelope, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
