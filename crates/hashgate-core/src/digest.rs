//! Payload digests.
//!
//! A digest is the 512-bit BLAKE2b hash of the payload bytes (no key, no
//! personalization), encoded with the standard base64 alphabet and padding.
//! The result is always [`DIGEST_LEN`] characters long.

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Length in bytes of the raw BLAKE2b-512 output.
pub const DIGEST_BYTES: usize = 64;

/// Length in characters of an encoded digest.
pub const DIGEST_LEN: usize = DIGEST_BYTES.div_ceil(3) * 4;

/// Computes the encoded digest of `payload`.
///
/// Pure and allocation-light; safe to call from any number of threads.
pub fn digest(payload: &[u8]) -> String {
    let hash = blake2b_simd::blake2b(payload);
    STANDARD.encode(hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str =
        "eGoC90IBWQPGxv2FJVLScpEvR0DhWEdhiobiF/cfVBnSXhAxr+5YUxOJZESTTrBLkDpoWxRIt1XVb3Aa/pvizg==";
    const ABC: &str =
        "uoClP5gcTQ1qJ5e2nxL26UwhLxRoWsS3SxK7b9v/otF9h8U5Kqt5LcJS1d5FM8yVGNOKqNvxklq5I4bt1ACZIw==";

    #[test]
    fn empty_payload_matches_known_vector() {
        assert_eq!(digest(b""), EMPTY);
    }

    #[test]
    fn abc_matches_known_vector() {
        assert_eq!(digest(b"abc"), ABC);
    }

    #[test]
    fn output_has_fixed_length() {
        let payloads: [&[u8]; 4] = [b"", b"a", b"hello world", &[0_u8; 4096]];
        for payload in payloads {
            assert_eq!(digest(payload).len(), DIGEST_LEN);
        }
        assert_eq!(DIGEST_LEN, 88);
    }

    #[test]
    fn deterministic_across_threads() {
        let expected = digest(b"hello");
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| digest(b"hello")))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(digest(b"hello"), digest(b"hello!"));
    }
}
