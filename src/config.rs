use std::collections::HashMap;

/// Size limits the frame codec enforces on an incoming frame before it has fully
/// buffered the envelope/value, so a malicious or confused peer can't make the receiver
/// allocate without bound. Defaults follow `spec.md` §4.C's recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_message_len: u32,
    pub max_value_len: u32,
}

impl Default for FrameLimits {
    fn default() -> FrameLimits {
        FrameLimits {
            max_message_len: 2 * 1024 * 1024,
            max_value_len: 1024 * 1024,
        }
    }
}

/// The identity/key table the Receiver uses to verify HMAC auth, plus the frame size
/// limits the codec enforces. Not a file-format config loader (out of scope per
/// `spec.md` §1), just the plain struct a host constructs in-process.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    identities: HashMap<u64, Vec<u8>>,
    pub frame_limits: FrameLimits,
}

impl ConnectionOptions {
    pub fn new() -> ConnectionOptions {
        ConnectionOptions {
            identities: HashMap::new(),
            frame_limits: FrameLimits::default(),
        }
    }

    /// Convenience constructor for the common case of a single preconfigured identity.
    pub fn single(user_id: u64, hmac_key: impl Into<Vec<u8>>) -> ConnectionOptions {
        let mut options = ConnectionOptions::new();
        options.add_identity(user_id, hmac_key);
        options
    }

    pub fn add_identity(&mut self, user_id: u64, hmac_key: impl Into<Vec<u8>>) -> &mut Self {
        self.identities.insert(user_id, hmac_key.into());
        self
    }

    pub fn key_for(&self, identity: u64) -> Option<&[u8]> {
        self.identities.get(&identity).map(Vec::as_slice)
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions::new()
    }
}
