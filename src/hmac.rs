use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::envelope::Envelope;

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies the keyed MAC over an envelope's authenticated portion. The
/// teacher's own crypto module (`t51core::net::crypto` / `flux::crypto`) wraps
/// `libsodium`'s AEAD cipher, which authenticates *and* encrypts; this provider only
/// needs a MAC, so it uses RustCrypto's `hmac`+`sha2`, the same family of crates the
/// rest of the example pack reaches for when it needs a MAC/AEAD primitive without FFI.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacProvider;

impl HmacProvider {
    pub fn new() -> HmacProvider {
        HmacProvider
    }

    /// MAC over the envelope's canonical bytes with `hmac_auth.hmac` cleared, per
    /// `spec.md` §4.B ("over the canonical serialization of the envelope minus the
    /// hmac_auth.hmac field itself").
    pub fn compute(&self, envelope: &Envelope, key: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
        mac.update(&Self::canonical_bytes(envelope));
        mac.finalize().into_bytes().to_vec()
    }

    /// `verify(envelope, key) == (compute(envelope, key) == envelope.hmac_auth.hmac)`,
    /// but performed in constant time via `Mac::verify_slice` rather than a manual
    /// byte-by-byte comparison.
    pub fn verify(&self, envelope: &Envelope, key: &[u8]) -> bool {
        let tag = match envelope.hmac_auth.as_ref() {
            Some(auth) => auth.hmac.as_slice(),
            None => return false,
        };

        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
        mac.update(&Self::canonical_bytes(envelope));
        mac.verify_slice(tag).is_ok()
    }

    fn canonical_bytes(envelope: &Envelope) -> Vec<u8> {
        let mut stripped = envelope.clone();
        if let Some(auth) = stripped.hmac_auth.as_mut() {
            auth.hmac.clear();
        }
        stripped.to_bytes()
    }
}
