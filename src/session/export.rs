// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted session state.
//!
//! ```text
//! session: id(16) || ed25519 seed(32) || dilithium2 secret key || dilithium2 verifying key ||
//!          ratchet count(u64) * ratchet || x25519 secret key(32) || kyber768 secret key ||
//!          kyber768 public key || peer count(u64) * peer
//! peer:    id(16) || ed25519 verifying key(32) || dilithium2 verifying key ||
//!          ratchet count(u64) * ratchet || x25519 public key(32) || kyber768 public key
//! ratchet: id(16) || symmetric chain key(32) || root chain key(32)
//! ```
//!
//! The encoding contains private key material in the clear and must only be written to storage
//! the caller already trusts.
use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::codec::Reader;
use crate::crypto::{Secret, dilithium, ed25519, kyber, x25519};
use crate::hybrid::{KemPublicKey, KemSecretKey};
use crate::identity::{SigningKeys, VerifyingKeys};
use crate::ratchet::{CHAIN_KEY_SIZE, Ratchet, RatchetId};
use crate::session::{RxSession, SessionError, StateError, TxSession};

const RATCHET_SIZE: usize = 16 + CHAIN_KEY_SIZE + CHAIN_KEY_SIZE;

const PEER_MIN_SIZE: usize = 16
    + ed25519::VERIFYING_KEY_SIZE
    + dilithium::VERIFYING_KEY_SIZE
    + 8
    + x25519::PUBLIC_KEY_SIZE
    + kyber::PUBLIC_KEY_SIZE;

impl TxSession {
    /// Serializes the complete session state including all private keys.
    pub fn export(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(self.id.as_bytes());
        bytes.extend_from_slice(self.signing_keys.ed25519().as_bytes());
        bytes.extend_from_slice(self.signing_keys.dilithium().as_bytes());
        bytes.extend_from_slice(self.signing_keys.verifying_keys().dilithium().as_bytes());
        write_ratchets(&mut bytes, self.ratchets.values());
        bytes.extend_from_slice(self.secret_key.x25519().as_bytes());
        bytes.extend_from_slice(self.secret_key.kyber().as_bytes());
        bytes.extend_from_slice(self.public_key.kyber().as_bytes());

        bytes.extend_from_slice(&(self.peers.len() as u64).to_be_bytes());
        for peer in self.peers.values() {
            bytes.extend_from_slice(peer.id.as_bytes());
            bytes.extend_from_slice(peer.verifying_keys.ed25519().as_bytes());
            bytes.extend_from_slice(peer.verifying_keys.dilithium().as_bytes());
            write_ratchets(&mut bytes, peer.ratchets.values());
            bytes.extend_from_slice(peer.public_key.x25519().as_bytes());
            bytes.extend_from_slice(peer.public_key.kyber().as_bytes());
        }

        debug!(id = %self.id, peers = self.peers.len(), "exported session");
        bytes
    }

    /// Restores a session from [`TxSession::export`] output.
    pub fn import(bytes: &[u8]) -> Result<Self, SessionError> {
        let session = decode_session(bytes)?;
        debug!(id = %session.id, peers = session.peers.len(), "imported session");
        Ok(session)
    }
}

fn write_ratchets<'a>(bytes: &mut Vec<u8>, ratchets: impl ExactSizeIterator<Item = &'a Ratchet>) {
    bytes.extend_from_slice(&(ratchets.len() as u64).to_be_bytes());
    for ratchet in ratchets {
        bytes.extend_from_slice(ratchet.id().as_bytes());
        bytes.extend_from_slice(ratchet.symmetric_chain().as_bytes());
        bytes.extend_from_slice(ratchet.root_chain().as_bytes());
    }
}

fn read_ratchets(reader: &mut Reader<'_>) -> Result<BTreeMap<RatchetId, Ratchet>, StateError> {
    let count = reader.read_count(RATCHET_SIZE)?;
    let mut ratchets = BTreeMap::new();
    for _ in 0..count {
        let id = RatchetId::from_bytes(reader.read_array()?);
        let symmetric = Secret::from_bytes(reader.read_array()?);
        let root = Secret::from_bytes(reader.read_array()?);
        if ratchets
            .insert(id, Ratchet::from_chain_keys(id, symmetric, root))
            .is_some()
        {
            return Err(StateError::DuplicateRatchet(id));
        }
    }
    Ok(ratchets)
}

fn read_peer(reader: &mut Reader<'_>, local_id: &Uuid) -> Result<RxSession, StateError> {
    let id = reader.read_uuid()?;
    let verifying_keys = VerifyingKeys::new(
        ed25519::VerifyingKey::from_bytes(reader.read_array()?),
        dilithium::VerifyingKey::from_bytes(reader.read_slice(dilithium::VERIFYING_KEY_SIZE)?)?,
    );
    let ratchets = read_ratchets(reader)?;
    let expected = RatchetId::derive(&id, local_id);
    if let Some(ratchet_id) = ratchets.keys().find(|ratchet_id| **ratchet_id != expected) {
        return Err(StateError::ForeignRatchet(id, *ratchet_id));
    }
    let public_key = KemPublicKey::new(
        x25519::PublicKey::from_bytes(reader.read_array()?),
        kyber::PublicKey::from_bytes(reader.read_slice(kyber::PUBLIC_KEY_SIZE)?)?,
    );
    Ok(RxSession::new(
        id,
        verifying_keys,
        public_key,
        ratchets.into_values(),
    ))
}

fn decode_session(bytes: &[u8]) -> Result<TxSession, StateError> {
    let mut reader = Reader::new(bytes);

    let id = reader.read_uuid()?;
    let signing_keys = SigningKeys::from_parts(
        ed25519::SigningKey::from_bytes(reader.read_array()?),
        dilithium::SigningKey::from_bytes(reader.read_slice(dilithium::SIGNING_KEY_SIZE)?)?,
        dilithium::VerifyingKey::from_bytes(reader.read_slice(dilithium::VERIFYING_KEY_SIZE)?)?,
    );
    let outgoing = read_ratchets(&mut reader)?;

    let x25519_secret = x25519::SecretKey::from_bytes(reader.read_array()?);
    let kyber_secret = kyber::SecretKey::from_bytes(reader.read_slice(kyber::SECRET_KEY_SIZE)?)?;
    let kyber_public = kyber::PublicKey::from_bytes(reader.read_slice(kyber::PUBLIC_KEY_SIZE)?)?;
    let public_key = KemPublicKey::new(x25519_secret.public_key(), kyber_public);
    let secret_key = KemSecretKey::new(x25519_secret, kyber_secret);

    let count = reader.read_count(PEER_MIN_SIZE)?;
    let mut peers = BTreeMap::new();
    for _ in 0..count {
        let peer = read_peer(&mut reader, &id)?;
        if peers.contains_key(&peer.id) {
            return Err(StateError::DuplicatePeer(peer.id));
        }
        peers.insert(peer.id, peer);
    }
    reader.finish()?;

    // Outgoing ratchets are stored by their id only, their peer follows from the id derivation.
    let mut ratchets: BTreeMap<Uuid, Ratchet> = BTreeMap::new();
    for (ratchet_id, ratchet) in outgoing {
        let peer_id = peers
            .keys()
            .find(|peer_id| RatchetId::derive(&id, peer_id) == ratchet_id)
            .copied()
            .ok_or(StateError::OrphanRatchet(ratchet_id))?;
        ratchets.insert(peer_id, ratchet);
    }
    if let Some(peer_id) = peers.keys().find(|peer_id| !ratchets.contains_key(peer_id)) {
        return Err(StateError::MissingRatchet(*peer_id));
    }

    Ok(TxSession {
        id,
        signing_keys,
        secret_key,
        public_key,
        ratchets,
        peers,
    })
}
