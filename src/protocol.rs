// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constants fixed by protocol version 1.
//!
//! Changing any of these values breaks compatibility with peers and with persisted sessions.
use uuid::Uuid;

/// HMAC tag deriving the output (message or fresh chain) key of a ratchet step.
pub const RATCHET_HMAC_OUTPUT: u8 = 0x01;

/// HMAC tag deriving the next chain key of a ratchet step.
pub const RATCHET_HMAC_CHAIN: u8 = 0x02;

/// HMAC tag deriving the shared secret of an ephemeral pairing.
pub const PAIRING_HMAC: u8 = 0x03;

/// HKDF info for the key sealing the X25519 payload of a ratchet update.
pub const UPDATE_DH_INFO: &[u8] = b"tungsten-v1-update-dh";

/// HKDF info for the key sealing the X25519 payload of an ephemeral pairing.
pub const PAIRING_DH_INFO: &[u8] = b"tungsten-v1-pairing-dh";

/// HKDF info for the initial root chain of a freshly registered ratchet.
pub const RATCHET_ROOT_INFO: &[u8] = b"tungsten-v1-ratchet-root";

/// HKDF info for the initial symmetric chain of a freshly registered ratchet.
pub const RATCHET_SYMMETRIC_INFO: &[u8] = b"tungsten-v1-ratchet-symmetric";

/// Namespace of the name-based UUIDs identifying ratchets.
pub const RATCHET_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6e1c_6b8e_23d4_4f0a_9c57_1f3e_a2b4_d809);

/// Salt of the Argon2id fingerprint hash.
pub const FINGERPRINT_SALT: &[u8] = b"tungsten-v1-fingerprint-salt";

/// Argon2id memory cost in KiB (64 MiB).
pub const FINGERPRINT_M_COST: u32 = 64 * 1024;

/// Argon2id iterations.
pub const FINGERPRINT_T_COST: u32 = 1;

/// Argon2id lanes.
pub const FINGERPRINT_P_COST: u32 = 1;

/// Argon2id output length, 120 bits are enough for 36 decimal digits.
pub const FINGERPRINT_HASH_SIZE: usize = 15;

/// Number of decimal digits shown to the user.
pub const FINGERPRINT_DIGITS: usize = 36;

/// Digits per space-separated group.
pub const FINGERPRINT_GROUP_SIZE: usize = 4;

/// Wire tag of an encrypted data message.
pub const MESSAGE_TYPE_DATA: u8 = 0x00;

/// Wire tag of a signed multi-recipient ratchet update.
pub const MESSAGE_TYPE_RATCHET_UPDATE: u8 = 0x01;
