// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format of signed protocol messages.
//!
//! Every message starts with the sender id and a type tag and ends with a dual signature over all
//! preceding bytes:
//!
//! ```text
//! data:   sender(16) || 0x00 || nonce(24) || ciphertext || signature
//! update: sender(16) || 0x01 || x25519(32) || kyber768 || count(u64) ||
//!         count * { recipient(16) || ratchet(16) || dh ciphertext(72) || kyber768 ciphertext } ||
//!         signature
//! ```
//!
//! Decoding happens in two steps: [`SignedMessage::split`] separates the signed prefix from the
//! signature so it can be verified first, only then [`WireMessage::decode`] parses the prefix.
use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use crate::codec::{CodecError, Reader};
use crate::crypto::kyber::{self, KyberError};
use crate::crypto::x25519;
use crate::crypto::xchacha20::{XAEAD_NONCE_SIZE, XAEAD_TAG_SIZE, XAeadNonce};
use crate::hybrid::{DH_CIPHERTEXT_SIZE, HybridCiphertext, KemPublicKey};
use crate::identity::{DualSignature, IdentityError, SIGNATURE_SIZE, SigningKeys};
use crate::protocol::{MESSAGE_TYPE_DATA, MESSAGE_TYPE_RATCHET_UPDATE};
use crate::ratchet::RatchetId;

/// Sender id and type tag.
pub const HEADER_SIZE: usize = 16 + 1;

/// Size of one encoded update entry.
pub const UPDATE_ENTRY_SIZE: usize = 16 + 16 + DH_CIPHERTEXT_SIZE + kyber::CIPHERTEXT_SIZE;

/// Protocol message, one variant per wire type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireMessage {
    Data(DataMessage),
    RatchetUpdate(UpdateMessage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataMessage {
    pub sender: Uuid,
    pub nonce: XAeadNonce,
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateMessage {
    pub sender: Uuid,
    /// Freshly rotated public keys of the sender.
    pub public_key: KemPublicKey,
    pub entries: Vec<UpdateEntry>,
}

/// Fresh root material for one ratchet, encapsulated to that ratchet's recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateEntry {
    pub recipient: Uuid,
    pub ratchet: RatchetId,
    pub ciphertext: HybridCiphertext,
}

impl WireMessage {
    pub fn sender(&self) -> Uuid {
        match self {
            WireMessage::Data(message) => message.sender,
            WireMessage::RatchetUpdate(message) => message.sender,
        }
    }

    /// Encodes the message and appends the dual signature over the encoding.
    pub fn sign(&self, signing_keys: &SigningKeys) -> Result<Vec<u8>, IdentityError> {
        let mut bytes = self.to_unsigned_bytes();
        let signature = signing_keys.sign(&bytes)?;
        bytes.extend_from_slice(&signature.to_bytes());
        Ok(bytes)
    }

    fn to_unsigned_bytes(&self) -> Vec<u8> {
        match self {
            WireMessage::Data(message) => {
                let mut bytes = Vec::with_capacity(
                    HEADER_SIZE + XAEAD_NONCE_SIZE + message.ciphertext.len() + SIGNATURE_SIZE,
                );
                bytes.extend_from_slice(message.sender.as_bytes());
                bytes.push(MESSAGE_TYPE_DATA);
                bytes.extend_from_slice(&message.nonce);
                bytes.extend_from_slice(&message.ciphertext);
                bytes
            }
            WireMessage::RatchetUpdate(message) => {
                let mut bytes = Vec::with_capacity(
                    HEADER_SIZE
                        + x25519::PUBLIC_KEY_SIZE
                        + kyber::PUBLIC_KEY_SIZE
                        + 8
                        + message.entries.len() * UPDATE_ENTRY_SIZE
                        + SIGNATURE_SIZE,
                );
                bytes.extend_from_slice(message.sender.as_bytes());
                bytes.push(MESSAGE_TYPE_RATCHET_UPDATE);
                bytes.extend_from_slice(message.public_key.x25519().as_bytes());
                bytes.extend_from_slice(message.public_key.kyber().as_bytes());
                bytes.extend_from_slice(&(message.entries.len() as u64).to_be_bytes());
                for entry in &message.entries {
                    bytes.extend_from_slice(entry.recipient.as_bytes());
                    bytes.extend_from_slice(entry.ratchet.as_bytes());
                    bytes.extend_from_slice(&entry.ciphertext.dh);
                    bytes.extend_from_slice(entry.ciphertext.kem.as_bytes());
                }
                bytes
            }
        }
    }

    /// Parses the signed prefix of a message. The signature must have been verified before.
    pub fn decode(unsigned: &[u8]) -> Result<Self, MessageError> {
        let mut reader = Reader::new(unsigned);
        let sender = reader.read_uuid()?;
        let message = match reader.read_u8()? {
            MESSAGE_TYPE_DATA => {
                let nonce: XAeadNonce = reader.read_array()?;
                let ciphertext = reader.read_slice(reader.remaining())?;
                if ciphertext.len() < XAEAD_TAG_SIZE {
                    return Err(MessageError::CiphertextTooShort(ciphertext.len()));
                }
                WireMessage::Data(DataMessage {
                    sender,
                    nonce,
                    ciphertext: ciphertext.to_vec(),
                })
            }
            MESSAGE_TYPE_RATCHET_UPDATE => {
                let x25519 = x25519::PublicKey::from_bytes(reader.read_array()?);
                let kyber =
                    kyber::PublicKey::from_bytes(reader.read_slice(kyber::PUBLIC_KEY_SIZE)?)?;
                let count = reader.read_count(UPDATE_ENTRY_SIZE)?;
                let mut entries = Vec::with_capacity(count);
                let mut ratchets = BTreeSet::new();
                for _ in 0..count {
                    let recipient = reader.read_uuid()?;
                    let ratchet = RatchetId::from_bytes(reader.read_array()?);
                    if !ratchets.insert(ratchet) {
                        return Err(MessageError::DuplicateEntry(ratchet));
                    }
                    let dh = reader.read_array()?;
                    let kem =
                        kyber::Ciphertext::from_bytes(reader.read_slice(kyber::CIPHERTEXT_SIZE)?)?;
                    entries.push(UpdateEntry {
                        recipient,
                        ratchet,
                        ciphertext: HybridCiphertext { dh, kem },
                    });
                }
                reader.finish()?;
                WireMessage::RatchetUpdate(UpdateMessage {
                    sender,
                    public_key: KemPublicKey::new(x25519, kyber),
                    entries,
                })
            }
            tag => return Err(MessageError::UnknownType(tag)),
        };
        Ok(message)
    }
}

/// Raw message split into its signed prefix and the signature over it.
#[derive(Debug)]
pub struct SignedMessage<'a> {
    pub sender: Uuid,
    pub unsigned: &'a [u8],
    pub signature: DualSignature,
}

impl<'a> SignedMessage<'a> {
    pub fn split(bytes: &'a [u8]) -> Result<Self, MessageError> {
        if bytes.len() < HEADER_SIZE + SIGNATURE_SIZE {
            return Err(MessageError::TooShort(bytes.len()));
        }
        let (unsigned, signature) = bytes.split_at(bytes.len() - SIGNATURE_SIZE);
        let sender = Reader::new(unsigned).read_uuid()?;
        Ok(Self {
            sender,
            unsigned,
            signature: DualSignature::from_bytes(signature)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message of {0} bytes is too short to be signed")]
    TooShort(usize),

    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),

    #[error("ciphertext of {0} bytes is shorter than the authentication tag")]
    CiphertextTooShort(usize),

    #[error("ratchet {0} is updated more than once")]
    DuplicateEntry(RatchetId),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Kyber(#[from] KyberError),

    #[error(transparent)]
    Signature(#[from] IdentityError),
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::codec::CodecError;
    use crate::crypto::Rng;
    use crate::crypto::xchacha20::XAEAD_TAG_SIZE;
    use crate::hybrid::{encapsulate, generate_keypair};
    use crate::identity::{SIGNATURE_SIZE, SigningKeys};
    use crate::protocol::UPDATE_DH_INFO;
    use crate::ratchet::RatchetId;

    use super::{
        DataMessage, HEADER_SIZE, MessageError, SignedMessage, UpdateEntry, UpdateMessage,
        WireMessage,
    };

    #[test]
    fn data_message_layout() {
        let rng = Rng::from_seed([1; 32]);
        let signing_keys = SigningKeys::generate(&rng).unwrap();

        let message = WireMessage::Data(DataMessage {
            sender: Uuid::from_u128(7),
            nonce: [5; 24],
            ciphertext: vec![9; 21],
        });
        let bytes = message.sign(&signing_keys).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + 24 + 21 + SIGNATURE_SIZE);
        assert_eq!(&bytes[..16], Uuid::from_u128(7).as_bytes());
        assert_eq!(bytes[16], 0);

        let signed = SignedMessage::split(&bytes).unwrap();
        assert_eq!(signed.sender, Uuid::from_u128(7));
        assert!(
            signing_keys
                .verifying_keys()
                .verify(signed.unsigned, &signed.signature)
                .is_ok()
        );
        assert_eq!(WireMessage::decode(signed.unsigned).unwrap(), message);
    }

    #[test]
    fn update_message_layout() {
        let rng = Rng::from_seed([2; 32]);
        let signing_keys = SigningKeys::generate(&rng).unwrap();
        let (secret_key, public_key) = generate_keypair(&rng).unwrap();
        let (_, recipient_public_key) = generate_keypair(&rng).unwrap();

        let (ciphertext, _) =
            encapsulate(secret_key.x25519(), &recipient_public_key, b"", UPDATE_DH_INFO, &rng)
                .unwrap();

        let sender = Uuid::from_u128(1);
        let recipient = Uuid::from_u128(2);
        let message = WireMessage::RatchetUpdate(UpdateMessage {
            sender,
            public_key,
            entries: vec![UpdateEntry {
                recipient,
                ratchet: RatchetId::derive(&sender, &recipient),
                ciphertext,
            }],
        });
        let bytes = message.sign(&signing_keys).unwrap();
        assert_eq!(bytes[16], 1);

        let signed = SignedMessage::split(&bytes).unwrap();
        assert_eq!(WireMessage::decode(signed.unsigned).unwrap(), message);
    }

    #[test]
    fn reject_malformed() {
        assert!(matches!(
            SignedMessage::split(&[0; 100]),
            Err(MessageError::TooShort(100))
        ));

        let mut unknown = vec![0; 16];
        unknown.push(7);
        assert!(matches!(
            WireMessage::decode(&unknown),
            Err(MessageError::UnknownType(7))
        ));

        let mut short_data = vec![0; 16];
        short_data.push(0);
        short_data.extend_from_slice(&[0; 24]);
        short_data.extend_from_slice(&[0; XAEAD_TAG_SIZE - 1]);
        assert!(matches!(
            WireMessage::decode(&short_data),
            Err(MessageError::CiphertextTooShort(_))
        ));

        let mut truncated_update = vec![0; 16];
        truncated_update.push(1);
        truncated_update.extend_from_slice(&[0; 32]);
        assert!(matches!(
            WireMessage::decode(&truncated_update),
            Err(MessageError::Codec(CodecError::UnexpectedEnd { .. }))
        ));
    }

    #[test]
    fn reject_duplicate_entries() {
        let rng = Rng::from_seed([3; 32]);
        let signing_keys = SigningKeys::generate(&rng).unwrap();
        let (secret_key, public_key) = generate_keypair(&rng).unwrap();
        let (_, recipient_public_key) = generate_keypair(&rng).unwrap();

        let (ciphertext, _) =
            encapsulate(secret_key.x25519(), &recipient_public_key, b"", UPDATE_DH_INFO, &rng)
                .unwrap();

        let sender = Uuid::from_u128(1);
        let recipient = Uuid::from_u128(2);
        let entry = UpdateEntry {
            recipient,
            ratchet: RatchetId::derive(&sender, &recipient),
            ciphertext,
        };
        let bytes = WireMessage::RatchetUpdate(UpdateMessage {
            sender,
            public_key,
            entries: vec![entry.clone(), entry],
        })
        .sign(&signing_keys)
        .unwrap();

        let signed = SignedMessage::split(&bytes).unwrap();
        assert!(matches!(
            WireMessage::decode(signed.unsigned),
            Err(MessageError::DuplicateEntry(_))
        ));
    }
}
