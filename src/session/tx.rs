// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::crypto::xchacha20::{XAeadNonce, x_aead_encrypt};
use crate::crypto::{Rng, Secret};
use crate::hybrid::{self, KemPublicKey, KemSecretKey};
use crate::identity::{PeerBundle, SigningKeys};
use crate::message::{DataMessage, SignedMessage, UpdateEntry, UpdateMessage, WireMessage};
use crate::protocol::UPDATE_DH_INFO;
use crate::ratchet::{Ratchet, RatchetId};
use crate::session::{Received, RxSession, SessionError};

/// Sending side of a local identity.
///
/// Owns the identity's signing keys and current hybrid key pair, one outgoing [`Ratchet`] per
/// registered peer and one [`RxSession`] per peer for the reverse direction.
///
/// Operations are not safe to run concurrently on the same session, callers serialize access
/// (for example by holding the session behind a lock). Failed operations leave the session
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSession {
    pub(super) id: Uuid,
    pub(super) signing_keys: SigningKeys,
    pub(super) secret_key: KemSecretKey,
    pub(super) public_key: KemPublicKey,
    pub(super) ratchets: BTreeMap<Uuid, Ratchet>,
    pub(super) peers: BTreeMap<Uuid, RxSession>,
}

impl TxSession {
    /// Provisions a new identity with fresh signing keys and hybrid key pair.
    pub fn generate(id: Uuid, rng: &Rng) -> Result<Self, SessionError> {
        let signing_keys = SigningKeys::generate(rng)?;
        let (secret_key, public_key) = hybrid::generate_keypair(rng)?;
        debug!(id = %id, "generated session");
        Ok(Self {
            id,
            signing_keys,
            secret_key,
            public_key,
            ratchets: BTreeMap::new(),
            peers: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current hybrid public key, rotated by every [`TxSession::generate_update`].
    pub fn public_key(&self) -> &KemPublicKey {
        &self.public_key
    }

    /// Public keys peers need to register this identity.
    pub fn public_bundle(&self) -> PeerBundle {
        PeerBundle {
            id: self.id,
            verifying_keys: self.signing_keys.verifying_keys(),
            kem_public_key: self.public_key.clone(),
        }
    }

    pub fn peers(&self) -> impl Iterator<Item = &Uuid> {
        self.peers.keys()
    }

    pub fn has_peer(&self, peer_id: &Uuid) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn peer(&self, peer_id: &Uuid) -> Option<&RxSession> {
        self.peers.get(peer_id)
    }

    /// Id of the outgoing ratchet towards `peer_id`.
    pub fn ratchet_id(&self, peer_id: &Uuid) -> Option<RatchetId> {
        self.ratchets.get(peer_id).map(Ratchet::id)
    }

    /// Registers a peer with the secret agreed on during pairing.
    ///
    /// Creates the outgoing ratchet towards the peer and the [`RxSession`] holding the mirrored
    /// ratchet for the peer's messages to us. The peer does the same with our bundle and ends up
    /// with the exact same chain keys.
    pub fn add_peer(
        &mut self,
        bundle: PeerBundle,
        pairing_secret: &Secret<32>,
    ) -> Result<(), SessionError> {
        if self.peers.contains_key(&bundle.id) {
            return Err(SessionError::PeerExists(bundle.id));
        }

        let outgoing =
            Ratchet::from_pairing_secret(RatchetId::derive(&self.id, &bundle.id), pairing_secret)?;
        let incoming =
            Ratchet::from_pairing_secret(RatchetId::derive(&bundle.id, &self.id), pairing_secret)?;

        debug!(
            id = %self.id,
            peer = %bundle.id,
            ratchet = %outgoing.id(),
            "registered peer"
        );

        self.ratchets.insert(bundle.id, outgoing);
        self.peers.insert(
            bundle.id,
            RxSession::new(
                bundle.id,
                bundle.verifying_keys,
                bundle.kem_public_key,
                [incoming],
            ),
        );
        Ok(())
    }

    /// Tears down both directions of the relationship with `peer_id`.
    pub fn remove_peer(&mut self, peer_id: &Uuid) -> Result<(), SessionError> {
        if self.peers.remove(peer_id).is_none() {
            return Err(SessionError::UnknownPeer(*peer_id));
        }
        self.ratchets.remove(peer_id);
        debug!(id = %self.id, peer = %peer_id, "removed peer");
        Ok(())
    }

    /// Encrypts `plaintext` for `peer_id` under the next message key and signs the result.
    pub fn send(
        &mut self,
        peer_id: &Uuid,
        plaintext: &[u8],
        rng: &Rng,
    ) -> Result<Vec<u8>, SessionError> {
        let ratchet = self
            .ratchets
            .get_mut(peer_id)
            .ok_or(SessionError::UnknownPeer(*peer_id))?;

        let nonce: XAeadNonce = rng.random_array()?;
        let mut next = ratchet.clone();
        let message_key = next.next_message_key();
        let ciphertext = x_aead_encrypt(message_key.as_bytes(), plaintext, nonce, None)?;

        let message = WireMessage::Data(DataMessage {
            sender: self.id,
            nonce,
            ciphertext,
        });
        let bytes = message.sign(&self.signing_keys)?;

        *ratchet = next;
        debug!(id = %self.id, peer = %peer_id, "sent data message");
        Ok(bytes)
    }

    /// Rotates the hybrid key pair and rekeys every outgoing ratchet.
    ///
    /// Fresh root material for each ratchet is encapsulated to the current public key of its
    /// recipient. All entries are bundled into one signed message which has to reach every peer
    /// before it sends its own next update.
    pub fn generate_update(&mut self, rng: &Rng) -> Result<Vec<u8>, SessionError> {
        let (secret_key, public_key) = hybrid::generate_keypair(rng)?;

        let mut ratchets = self.ratchets.clone();
        let mut entries = Vec::with_capacity(ratchets.len());
        for (peer_id, ratchet) in ratchets.iter_mut() {
            let peer = self
                .peers
                .get(peer_id)
                .ok_or(SessionError::UnknownPeer(*peer_id))?;
            let (ciphertext, secret) = hybrid::encapsulate(
                secret_key.x25519(),
                peer.public_key(),
                ratchet.root_chain().as_bytes(),
                UPDATE_DH_INFO,
                rng,
            )?;
            ratchet.rekey(&secret.dh, &secret.kem);
            entries.push(UpdateEntry {
                recipient: *peer_id,
                ratchet: ratchet.id(),
                ciphertext,
            });
        }

        let message = WireMessage::RatchetUpdate(UpdateMessage {
            sender: self.id,
            public_key: public_key.clone(),
            entries,
        });
        let bytes = message.sign(&self.signing_keys)?;

        self.ratchets = ratchets;
        self.secret_key = secret_key;
        self.public_key = public_key;
        debug!(id = %self.id, ratchets = self.ratchets.len(), "generated ratchet update");
        Ok(bytes)
    }

    /// Routes a message to the [`RxSession`] of its sender.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<Received, SessionError> {
        let signed = SignedMessage::split(bytes).inspect_err(|err| {
            warn!(id = %self.id, "rejecting message: {err}");
        })?;

        let Some(peer) = self.peers.get_mut(&signed.sender) else {
            warn!(id = %self.id, sender = %signed.sender, "rejecting message from unknown sender");
            return Err(SessionError::UnknownSender(signed.sender));
        };

        peer.receive_signed(&self.id, &self.secret_key, &signed)
    }
}
