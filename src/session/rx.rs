// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::crypto::xchacha20::x_aead_decrypt;
use crate::hybrid::{self, KemPublicKey, KemSecretKey};
use crate::identity::VerifyingKeys;
use crate::message::{DataMessage, SignedMessage, UpdateEntry, UpdateMessage, WireMessage};
use crate::protocol::UPDATE_DH_INFO;
use crate::ratchet::{Ratchet, RatchetId};
use crate::session::SessionError;

/// Outcome of an accepted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
    /// Decrypted payload of a data message.
    Plaintext(Vec<u8>),

    /// A ratchet update was applied, `applied` counts the ratchets which were rekeyed.
    RatchetUpdate { applied: usize },
}

/// Receiving side of the channel from one remote peer to the local identity.
///
/// Holds the peer's pinned verifying keys, its last announced hybrid public key and the ratchets
/// the peer addresses to us. The local hybrid secret key is not owned here, the owning
/// `TxSession` passes it into [`RxSession::receive_message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RxSession {
    pub(super) id: Uuid,
    pub(super) verifying_keys: VerifyingKeys,
    pub(super) public_key: KemPublicKey,
    pub(super) ratchets: BTreeMap<RatchetId, Ratchet>,
}

impl RxSession {
    pub(super) fn new(
        id: Uuid,
        verifying_keys: VerifyingKeys,
        public_key: KemPublicKey,
        ratchets: impl IntoIterator<Item = Ratchet>,
    ) -> Self {
        Self {
            id,
            verifying_keys,
            public_key,
            ratchets: ratchets
                .into_iter()
                .map(|ratchet| (ratchet.id(), ratchet))
                .collect(),
        }
    }

    /// Id of the remote peer.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn verifying_keys(&self) -> &VerifyingKeys {
        &self.verifying_keys
    }

    /// Last hybrid public key the remote peer announced.
    pub fn public_key(&self) -> &KemPublicKey {
        &self.public_key
    }

    pub fn ratchet_ids(&self) -> impl Iterator<Item = &RatchetId> {
        self.ratchets.keys()
    }

    /// Verifies and processes a message from the remote peer addressed to `local_id`.
    pub fn receive_message(
        &mut self,
        local_id: &Uuid,
        local_secret_key: &KemSecretKey,
        bytes: &[u8],
    ) -> Result<Received, SessionError> {
        let signed = SignedMessage::split(bytes)?;
        self.receive_signed(local_id, local_secret_key, &signed)
    }

    pub(super) fn receive_signed(
        &mut self,
        local_id: &Uuid,
        local_secret_key: &KemSecretKey,
        signed: &SignedMessage<'_>,
    ) -> Result<Received, SessionError> {
        // Nothing is parsed or decrypted before both signatures are valid.
        if let Err(err) = self.verifying_keys.verify(signed.unsigned, &signed.signature) {
            warn!(peer = %self.id, "rejecting message: {err}");
            return Err(SessionError::AuthenticationFailed);
        }

        let message = WireMessage::decode(signed.unsigned).inspect_err(|err| {
            warn!(peer = %self.id, "rejecting message: {err}");
        })?;

        if message.sender() != self.id {
            warn!(
                peer = %self.id,
                sender = %message.sender(),
                "rejecting message signed for another sender"
            );
            return Err(SessionError::AuthenticationFailed);
        }

        match message {
            WireMessage::Data(message) => self.receive_data(local_id, message),
            WireMessage::RatchetUpdate(message) => {
                self.receive_update(local_id, local_secret_key, message)
            }
        }
    }

    fn receive_data(
        &mut self,
        local_id: &Uuid,
        message: DataMessage,
    ) -> Result<Received, SessionError> {
        let ratchet_id = RatchetId::derive(&self.id, local_id);
        let ratchet = self
            .ratchets
            .get_mut(&ratchet_id)
            .ok_or(SessionError::UnknownRatchet(ratchet_id))?;

        let mut next = ratchet.clone();
        let message_key = next.next_message_key();
        let plaintext = x_aead_decrypt(
            message_key.as_bytes(),
            &message.ciphertext,
            message.nonce,
            None,
        )
        .map_err(|_| {
            warn!(
                peer = %self.id,
                ratchet = %ratchet_id,
                "rejecting data message: payload tampered"
            );
            SessionError::PayloadTampered
        })?;

        *ratchet = next;
        debug!(peer = %self.id, ratchet = %ratchet_id, "received data message");
        Ok(Received::Plaintext(plaintext))
    }

    /// Applies every entry addressed to `local_id` or none of them.
    fn receive_update(
        &mut self,
        local_id: &Uuid,
        local_secret_key: &KemSecretKey,
        message: UpdateMessage,
    ) -> Result<Received, SessionError> {
        let mut ratchets = self.ratchets.clone();
        let mut applied = 0;

        for entry in message
            .entries
            .iter()
            .filter(|entry| &entry.recipient == local_id)
        {
            if let Err(err) =
                apply_update_entry(&mut ratchets, local_secret_key, &message.public_key, entry)
            {
                if applied > 0 {
                    error!(
                        peer = %self.id,
                        applied,
                        "reverting partially applied ratchet update: {err}"
                    );
                } else {
                    warn!(
                        peer = %self.id,
                        ratchet = %entry.ratchet,
                        "rejecting ratchet update: {err}"
                    );
                }
                return Err(err);
            }
            applied += 1;
        }

        self.ratchets = ratchets;
        self.public_key = message.public_key;
        debug!(peer = %self.id, applied, "applied ratchet update");
        Ok(Received::RatchetUpdate { applied })
    }
}

fn apply_update_entry(
    ratchets: &mut BTreeMap<RatchetId, Ratchet>,
    local_secret_key: &KemSecretKey,
    sender_public_key: &KemPublicKey,
    entry: &UpdateEntry,
) -> Result<(), SessionError> {
    let ratchet = ratchets
        .get_mut(&entry.ratchet)
        .ok_or(SessionError::UnknownRatchet(entry.ratchet))?;
    let secret = hybrid::decapsulate(
        local_secret_key,
        sender_public_key.x25519(),
        &entry.ciphertext,
        ratchet.root_chain().as_bytes(),
        UPDATE_DH_INFO,
    )?;
    ratchet.rekey(&secret.dh, &secret.kem);
    Ok(())
}
