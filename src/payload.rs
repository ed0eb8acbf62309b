//! Fixed echo payload shared by the client's send and verify paths.

use bytes::Bytes;

/// Byte used to fill every payload.
pub const FILL_BYTE: u8 = b'z';

/// Immutable fixed-length byte pattern used as the echo content.
///
/// Clones are cheap and share the same backing storage, so every
/// connection thread can hold its own handle.
#[derive(Debug, Clone)]
pub struct FixedPayload {
    bytes: Bytes,
}

impl FixedPayload {
    /// Create a payload of `len` fill bytes.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: Bytes::from(vec![FILL_BYTE; len]),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Exact-match check of an echoed buffer against the sent bytes.
    pub fn matches(&self, echoed: &[u8]) -> bool {
        *self.bytes == *echoed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_contents() {
        let payload = FixedPayload::new(4);
        assert_eq!(payload.len(), 4);
        assert_eq!(payload.as_slice(), b"zzzz");
    }

    #[test]
    fn test_payload_matches() {
        let payload = FixedPayload::new(3);
        assert!(payload.matches(b"zzz"));
        assert!(!payload.matches(b"zzy"));
        assert!(!payload.matches(b"zz"));
    }

    #[test]
    fn test_clone_shares_storage() {
        let payload = FixedPayload::new(8);
        let copy = payload.clone();
        assert_eq!(payload.as_slice().as_ptr(), copy.as_slice().as_ptr());
    }
}
