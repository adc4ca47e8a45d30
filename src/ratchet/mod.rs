// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forward-secret channel from one sender to exactly one recipient.
//!
//! A [`Ratchet`] pairs a root chain, which only moves when fresh key-exchange material arrives
//! with a ratchet update, and a symmetric chain, which moves once per message. The sender keeps
//! its copy inside its `TxSession`, the recipient keeps a bit-identical mirror inside the
//! `RxSession` for that sender.
mod chain;

use std::fmt;

use uuid::Uuid;

use crate::crypto::Secret;
use crate::crypto::hkdf::{HkdfError, hkdf};
use crate::protocol::{RATCHET_ID_NAMESPACE, RATCHET_ROOT_INFO, RATCHET_SYMMETRIC_INFO};

pub use chain::{
    CHAIN_KEY_SIZE, ChainKey, ExchangeSecret, MESSAGE_KEY_SIZE, MessageKey, RootRatchet,
    SymRatchet, advance_root, advance_symmetric,
};

/// Stable identifier of a ratchet, identical on the sending and the receiving side.
///
/// The id is a name-based UUID over the sender and recipient identities, so the recipient can
/// compute it from the sender id of an incoming message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RatchetId(Uuid);

impl RatchetId {
    pub fn derive(sender: &Uuid, recipient: &Uuid) -> Self {
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(sender.as_bytes());
        name[16..].copy_from_slice(recipient.as_bytes());
        Self(Uuid::new_v5(&RATCHET_ID_NAMESPACE, &name))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RatchetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ratchet {
    id: RatchetId,
    root: RootRatchet,
    symmetric: SymRatchet,
}

impl Ratchet {
    /// Seeds both chains of a new ratchet from the secret two peers agreed on while pairing.
    ///
    /// The ratchet id salts the derivation, so the two directions between the same peers never
    /// share chain keys.
    pub fn from_pairing_secret(id: RatchetId, secret: &Secret<32>) -> Result<Self, HkdfError> {
        let root: [u8; CHAIN_KEY_SIZE] =
            hkdf(id.as_bytes(), secret.as_bytes(), Some(RATCHET_ROOT_INFO))?;
        let symmetric: [u8; CHAIN_KEY_SIZE] =
            hkdf(id.as_bytes(), secret.as_bytes(), Some(RATCHET_SYMMETRIC_INFO))?;
        Ok(Self::from_chain_keys(
            id,
            Secret::from_bytes(symmetric),
            Secret::from_bytes(root),
        ))
    }

    pub(crate) fn from_chain_keys(id: RatchetId, symmetric: ChainKey, root: ChainKey) -> Self {
        Self {
            id,
            root: RootRatchet::new(root),
            symmetric: SymRatchet::new(symmetric),
        }
    }

    pub fn id(&self) -> RatchetId {
        self.id
    }

    /// Moves the symmetric chain one step and returns the key for the next message.
    pub(crate) fn next_message_key(&mut self) -> MessageKey {
        self.symmetric.advance()
    }

    /// Folds fresh exchange material into the root chain and replaces the symmetric chain with
    /// the derived one.
    pub(crate) fn rekey(&mut self, dh: &ExchangeSecret, kem: &ExchangeSecret) {
        let chain = self.root.advance(dh, kem);
        self.symmetric = SymRatchet::new(chain);
    }

    pub(crate) fn symmetric_chain(&self) -> &ChainKey {
        self.symmetric.chain_key()
    }

    pub(crate) fn root_chain(&self) -> &ChainKey {
        self.root.chain_key()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::crypto::{Rng, Secret};

    use super::{Ratchet, RatchetId};

    #[test]
    fn ratchet_id_is_directional() {
        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);

        assert_eq!(RatchetId::derive(&alice, &bob), RatchetId::derive(&alice, &bob));
        assert_ne!(RatchetId::derive(&alice, &bob), RatchetId::derive(&bob, &alice));
    }

    #[test]
    fn pairing_secret_seeds_mirrored_ratchets() {
        let rng = Rng::from_seed([1; 32]);
        let secret = Secret::from_bytes(rng.random_array().unwrap());

        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);

        let mut outgoing =
            Ratchet::from_pairing_secret(RatchetId::derive(&alice, &bob), &secret).unwrap();
        let mut mirrored =
            Ratchet::from_pairing_secret(RatchetId::derive(&alice, &bob), &secret).unwrap();
        let reverse =
            Ratchet::from_pairing_secret(RatchetId::derive(&bob, &alice), &secret).unwrap();

        assert_eq!(outgoing, mirrored);
        assert_ne!(outgoing.symmetric_chain(), reverse.symmetric_chain());
        assert_ne!(outgoing.root_chain(), outgoing.symmetric_chain());

        assert_eq!(outgoing.next_message_key(), mirrored.next_message_key());
    }

    #[test]
    fn rekey_replaces_symmetric_chain() {
        let rng = Rng::from_seed([2; 32]);
        let secret = Secret::from_bytes(rng.random_array().unwrap());
        let id = RatchetId::derive(&Uuid::from_u128(1), &Uuid::from_u128(2));

        let mut ratchet = Ratchet::from_pairing_secret(id, &secret).unwrap();
        let before = ratchet.clone();

        let dh = Secret::from_bytes(rng.random_array().unwrap());
        let kem = Secret::from_bytes(rng.random_array().unwrap());
        ratchet.rekey(&dh, &kem);

        assert_ne!(ratchet.root_chain(), before.root_chain());
        assert_ne!(ratchet.symmetric_chain(), before.symmetric_chain());
        assert_eq!(ratchet.id(), before.id());
    }
}
