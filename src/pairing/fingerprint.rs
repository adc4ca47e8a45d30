// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-comparable safety number of a pairing.
//!
//! Both parties hash their public keys and the pairing secret with Argon2id and read the digest
//! to each other out-of-band. The public keys are ordered before hashing so the initiator and the
//! responder arrive at the same digits.
use argon2::{Algorithm, Argon2, Params, Version};

use crate::crypto::Secret;
use crate::pairing::{EphemeralPublicKey, EphemeralSecretKey, PairingError};
use crate::protocol::{
    FINGERPRINT_DIGITS, FINGERPRINT_GROUP_SIZE, FINGERPRINT_HASH_SIZE, FINGERPRINT_M_COST,
    FINGERPRINT_P_COST, FINGERPRINT_SALT, FINGERPRINT_T_COST,
};

/// Returns 36 decimal digits in nine space-separated groups of four.
///
/// A mismatch between both parties means the exchange was intercepted and the pairing secret
/// must not be trusted.
pub fn fingerprint(
    local: &EphemeralSecretKey,
    remote: &EphemeralPublicKey,
    secret: &Secret<32>,
) -> Result<String, PairingError> {
    let local = local.public_key().to_bytes();
    let remote = remote.to_bytes();
    let (first, second) = if local <= remote {
        (local, remote)
    } else {
        (remote, local)
    };

    let mut input = Vec::with_capacity(first.len() + second.len() + 32);
    input.extend_from_slice(&first);
    input.extend_from_slice(&second);
    input.extend_from_slice(secret.as_bytes());

    let params = Params::new(
        FINGERPRINT_M_COST,
        FINGERPRINT_T_COST,
        FINGERPRINT_P_COST,
        Some(FINGERPRINT_HASH_SIZE),
    )
    .map_err(|err| PairingError::Fingerprint(err.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut digest = [0u8; FINGERPRINT_HASH_SIZE];
    argon2
        .hash_password_into(&input, FINGERPRINT_SALT, &mut digest)
        .map_err(|err| PairingError::Fingerprint(err.to_string()))?;

    Ok(format_digits(&digest))
}

/// Renders the 36 least-significant decimal digits of the big-endian `digest`.
fn format_digits(digest: &[u8; FINGERPRINT_HASH_SIZE]) -> String {
    let mut value_bytes = [0u8; 16];
    value_bytes[16 - FINGERPRINT_HASH_SIZE..].copy_from_slice(digest);
    let value = u128::from_be_bytes(value_bytes) % 10u128.pow(FINGERPRINT_DIGITS as u32);

    let digits = format!("{value:0width$}", width = FINGERPRINT_DIGITS);
    digits
        .as_bytes()
        .chunks(FINGERPRINT_GROUP_SIZE)
        .map(|group| String::from_utf8_lossy(group).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::format_digits;

    #[test]
    fn digit_groups() {
        let formatted = format_digits(&[0; 15]);
        assert_eq!(
            formatted,
            "0000 0000 0000 0000 0000 0000 0000 0000 0000"
        );

        let mut digest = [0u8; 15];
        digest[14] = 0x2a;
        assert_eq!(
            format_digits(&digest),
            "0000 0000 0000 0000 0000 0000 0000 0000 0042"
        );

        let formatted = format_digits(&[0xff; 15]);
        let groups: Vec<&str> = formatted.split(' ').collect();
        assert_eq!(groups.len(), 9);
        assert!(
            groups
                .iter()
                .all(|group| group.len() == 4 && group.bytes().all(|b| b.is_ascii_digit()))
        );
    }
}
