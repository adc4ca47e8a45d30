// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC with SHA256.
//!
//! <https://www.rfc-editor.org/rfc/rfc2104>
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

pub const HMAC_SHA256_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Computes HMAC-SHA256 where the key is the concatenation of all `key_parts`.
///
/// Callers only pass fixed-size parts, otherwise two different splits of the same bytes would
/// produce the same key.
pub fn hmac_sha256(key_parts: &[&[u8]], messages: &[&[u8]]) -> [u8; HMAC_SHA256_SIZE] {
    let key = Zeroizing::new(key_parts.concat());
    // HMAC accepts keys of any length.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key).expect("hmac takes any key size");
    for message in messages {
        mac.update(message);
    }
    let mut out = [0u8; HMAC_SHA256_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::hmac_sha256;

    #[test]
    fn key_parts_are_concatenated() {
        let split = hmac_sha256(&[b"chain", b"key"], &[&[0x01]]);
        let joined = hmac_sha256(&[b"chainkey"], &[&[0x01]]);
        assert_eq!(split, joined);
    }

    #[test]
    fn tags_separate_outputs() {
        let key = [9u8; 32];
        assert_ne!(
            hmac_sha256(&[&key], &[&[0x01]]),
            hmac_sha256(&[&key], &[&[0x02]])
        );
    }

    #[test]
    fn rfc4231_test_case_2() {
        let mac = hmac_sha256(&[b"Jefe"], &[b"what do ya want ", b"for nothing?"]);
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
