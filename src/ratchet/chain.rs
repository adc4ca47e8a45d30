// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-way HMAC-SHA256 key derivation chains.
//!
//! Every step keys HMAC-SHA256 with the current chain key (folded together with fresh
//! key-exchange material for the root chain) and evaluates it twice under single-byte tags: once
//! for the next chain key and once for the output key. The previous chain key is dropped, so
//! outputs can not be re-derived after the chain moved on.
//!
//! ```text
//! chain_n ──HMAC(0x02)──> chain_n+1 ──HMAC(0x02)──> chain_n+2 ...
//!    │                       │
//!    └──HMAC(0x01)──> key_n  └──HMAC(0x01)──> key_n+1
//! ```
use crate::crypto::Secret;
use crate::crypto::hmac::hmac_sha256;
use crate::protocol::{RATCHET_HMAC_CHAIN, RATCHET_HMAC_OUTPUT};

pub const CHAIN_KEY_SIZE: usize = 32;

pub const MESSAGE_KEY_SIZE: usize = 32;

/// Mutable state of a ratchet chain.
pub type ChainKey = Secret<CHAIN_KEY_SIZE>;

/// One-time key derived from a symmetric chain, used to encrypt exactly one message.
pub type MessageKey = Secret<MESSAGE_KEY_SIZE>;

/// Key-exchange output folded into the root chain, both halves are 32 bytes.
pub type ExchangeSecret = Secret<32>;

/// Derives the next chain key and a message key from a symmetric chain key.
pub fn advance_symmetric(chain: &ChainKey) -> (ChainKey, MessageKey) {
    let next = hmac_sha256(&[chain.as_bytes()], &[&[RATCHET_HMAC_CHAIN]]);
    let output = hmac_sha256(&[chain.as_bytes()], &[&[RATCHET_HMAC_OUTPUT]]);
    (Secret::from_bytes(next), Secret::from_bytes(output))
}

/// Derives the next root chain key and a fresh symmetric chain key, folding in the X25519 and
/// Kyber768 payload secrets of one ratchet update.
///
/// The HMAC key is `chain || dh || kem` without length prefixes, all three inputs are fixed-size.
pub fn advance_root(
    chain: &ChainKey,
    dh: &ExchangeSecret,
    kem: &ExchangeSecret,
) -> (ChainKey, ChainKey) {
    let key: [&[u8]; 3] = [chain.as_bytes(), dh.as_bytes(), kem.as_bytes()];
    let next = hmac_sha256(&key, &[&[RATCHET_HMAC_CHAIN]]);
    let output = hmac_sha256(&key, &[&[RATCHET_HMAC_OUTPUT]]);
    (Secret::from_bytes(next), Secret::from_bytes(output))
}

/// Symmetric ratchet handing out one message key per step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymRatchet {
    current: ChainKey,
}

impl SymRatchet {
    pub fn new(chain: ChainKey) -> Self {
        Self { current: chain }
    }

    pub fn advance(&mut self) -> MessageKey {
        let (next, message_key) = advance_symmetric(&self.current);
        self.current = next;
        message_key
    }

    pub(crate) fn chain_key(&self) -> &ChainKey {
        &self.current
    }
}

/// Root ratchet folding fresh key-exchange material into the chain.
///
/// Every call must consume freshly encapsulated material, otherwise both peers derive the same
/// symmetric chain twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootRatchet {
    current: ChainKey,
}

impl RootRatchet {
    pub fn new(chain: ChainKey) -> Self {
        Self { current: chain }
    }

    pub fn advance(&mut self, dh: &ExchangeSecret, kem: &ExchangeSecret) -> ChainKey {
        let (next, output) = advance_root(&self.current, dh, kem);
        self.current = next;
        output
    }

    pub(crate) fn chain_key(&self) -> &ChainKey {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::{Rng, Secret};

    use super::{RootRatchet, SymRatchet, advance_root, advance_symmetric};

    #[test]
    fn symmetric_forward_secrecy() {
        let rng = Rng::from_seed([1; 32]);
        let start = Secret::from_bytes(rng.random_array().unwrap());

        let (chain_1, key_1) = advance_symmetric(&start);
        let (chain_2, key_2) = advance_symmetric(&chain_1);

        assert_ne!(key_1, key_2);
        assert_ne!(chain_1, start);
        assert_ne!(chain_2, chain_1);
        assert_ne!(key_1, chain_1);
    }

    #[test]
    fn deterministic_steps() {
        let rng = Rng::from_seed([2; 32]);
        let chain = Secret::from_bytes(rng.random_array().unwrap());
        let dh = Secret::from_bytes(rng.random_array().unwrap());
        let kem = Secret::from_bytes(rng.random_array().unwrap());

        assert_eq!(advance_symmetric(&chain), advance_symmetric(&chain));
        assert_eq!(
            advance_root(&chain, &dh, &kem),
            advance_root(&chain, &dh, &kem)
        );
    }

    #[test]
    fn root_depends_on_exchange_material() {
        let rng = Rng::from_seed([3; 32]);
        let chain = Secret::from_bytes(rng.random_array().unwrap());
        let dh = Secret::from_bytes(rng.random_array().unwrap());
        let kem = Secret::from_bytes(rng.random_array().unwrap());
        let other = Secret::from_bytes(rng.random_array().unwrap());

        let (next, output) = advance_root(&chain, &dh, &kem);
        assert_ne!(advance_root(&chain, &other, &kem).1, output);
        assert_ne!(advance_root(&chain, &dh, &other).1, output);

        // Swapping the two exchange halves must not collide either.
        assert_ne!(advance_root(&chain, &kem, &dh).1, output);
        assert_ne!(next, output);
    }

    #[test]
    fn mirrored_ratchets_converge() {
        let rng = Rng::from_seed([4; 32]);
        let seed: [u8; 32] = rng.random_array().unwrap();

        let mut alice = SymRatchet::new(Secret::from_bytes(seed));
        let mut bob = SymRatchet::new(Secret::from_bytes(seed));
        for _ in 0..5 {
            assert_eq!(alice.advance(), bob.advance());
        }

        let dh = Secret::from_bytes(rng.random_array().unwrap());
        let kem = Secret::from_bytes(rng.random_array().unwrap());
        let mut alice_root = RootRatchet::new(Secret::from_bytes(seed));
        let mut bob_root = RootRatchet::new(Secret::from_bytes(seed));
        assert_eq!(alice_root.advance(&dh, &kem), bob_root.advance(&dh, &kem));
        assert_eq!(alice_root, bob_root);
    }
}
