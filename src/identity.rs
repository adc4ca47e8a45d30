// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term identity keys and their dual Ed25519 and Dilithium2 signatures.
//!
//! Every wire message carries both signatures over the same bytes and is only accepted when both
//! verify. A forger therefore needs to break the classical and the post-quantum scheme.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::dilithium::{self, DilithiumError};
use crate::crypto::ed25519::{self, SignatureError};
use crate::crypto::kyber::{self, KyberError};
use crate::crypto::{Rng, RngError, x25519};
use crate::hybrid::KemPublicKey;

/// Size of an encoded dual signature.
pub const SIGNATURE_SIZE: usize = ed25519::SIGNATURE_SIZE + dilithium::SIGNATURE_SIZE;

/// Ed25519 and Dilithium2 signing keys of one identity.
///
/// The Dilithium2 verifying key is kept next to its signing key as it can't be recovered from the
/// packed secret key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningKeys {
    ed25519: ed25519::SigningKey,
    dilithium: dilithium::SigningKey,
    dilithium_verifying: dilithium::VerifyingKey,
}

impl SigningKeys {
    pub fn generate(rng: &Rng) -> Result<Self, RngError> {
        let ed25519 = ed25519::SigningKey::from_bytes(rng.random_array()?);
        let (dilithium_verifying, dilithium) = dilithium::generate_keypair(rng)?;
        Ok(Self {
            ed25519,
            dilithium,
            dilithium_verifying,
        })
    }

    pub(crate) fn from_parts(
        ed25519: ed25519::SigningKey,
        dilithium: dilithium::SigningKey,
        dilithium_verifying: dilithium::VerifyingKey,
    ) -> Self {
        Self {
            ed25519,
            dilithium,
            dilithium_verifying,
        }
    }

    pub(crate) fn ed25519(&self) -> &ed25519::SigningKey {
        &self.ed25519
    }

    pub(crate) fn dilithium(&self) -> &dilithium::SigningKey {
        &self.dilithium
    }

    pub fn verifying_keys(&self) -> VerifyingKeys {
        VerifyingKeys {
            ed25519: self.ed25519.verifying_key(),
            dilithium: self.dilithium_verifying.clone(),
        }
    }

    pub fn sign(&self, bytes: &[u8]) -> Result<DualSignature, IdentityError> {
        Ok(DualSignature {
            ed25519: self.ed25519.sign(bytes),
            dilithium: self.dilithium.sign(bytes)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKeys {
    ed25519: ed25519::VerifyingKey,
    dilithium: dilithium::VerifyingKey,
}

impl VerifyingKeys {
    pub fn new(ed25519: ed25519::VerifyingKey, dilithium: dilithium::VerifyingKey) -> Self {
        Self { ed25519, dilithium }
    }

    pub fn ed25519(&self) -> &ed25519::VerifyingKey {
        &self.ed25519
    }

    pub fn dilithium(&self) -> &dilithium::VerifyingKey {
        &self.dilithium
    }

    /// Succeeds only if both signatures are valid for `bytes`.
    pub fn verify(&self, bytes: &[u8], signature: &DualSignature) -> Result<(), IdentityError> {
        self.ed25519.verify(bytes, &signature.ed25519)?;
        self.dilithium.verify(bytes, &signature.dilithium)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DualSignature {
    ed25519: ed25519::Signature,
    dilithium: dilithium::Signature,
}

impl DualSignature {
    /// Ed25519 signature followed by the Dilithium2 signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SIGNATURE_SIZE);
        bytes.extend_from_slice(self.ed25519.as_bytes());
        bytes.extend_from_slice(self.dilithium.as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(IdentityError::InvalidSignatureLength(bytes.len()));
        }
        let (ed25519, dilithium) = bytes.split_at(ed25519::SIGNATURE_SIZE);
        let mut ed25519_bytes = [0u8; ed25519::SIGNATURE_SIZE];
        ed25519_bytes.copy_from_slice(ed25519);
        Ok(Self {
            ed25519: ed25519::Signature::from_bytes(ed25519_bytes),
            dilithium: dilithium::Signature::from_bytes(dilithium)?,
        })
    }
}

/// Public keys an identity hands to peers so they can register it.
///
/// Bundles are exchanged out-of-band or published in a directory and encoded as CBOR.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawPeerBundle", try_from = "RawPeerBundle")]
pub struct PeerBundle {
    pub id: Uuid,
    pub verifying_keys: VerifyingKeys,
    pub kem_public_key: KemPublicKey,
}

impl PeerBundle {
    pub fn to_bytes(&self) -> Result<Vec<u8>, IdentityError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| IdentityError::Encode(err.to_string()))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        ciborium::from_reader(bytes).map_err(|err| IdentityError::Decode(err.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct RawPeerBundle {
    id: Uuid,
    #[serde(with = "serde_bytes")]
    ed25519: [u8; ed25519::VERIFYING_KEY_SIZE],
    #[serde(with = "serde_bytes")]
    dilithium: Vec<u8>,
    #[serde(with = "serde_bytes")]
    x25519: [u8; x25519::PUBLIC_KEY_SIZE],
    #[serde(with = "serde_bytes")]
    kyber: Vec<u8>,
}

impl From<PeerBundle> for RawPeerBundle {
    fn from(bundle: PeerBundle) -> Self {
        Self {
            id: bundle.id,
            ed25519: bundle.verifying_keys.ed25519.to_bytes(),
            dilithium: bundle.verifying_keys.dilithium.as_bytes().to_vec(),
            x25519: bundle.kem_public_key.x25519().to_bytes(),
            kyber: bundle.kem_public_key.kyber().as_bytes().to_vec(),
        }
    }
}

impl TryFrom<RawPeerBundle> for PeerBundle {
    type Error = IdentityError;

    fn try_from(raw: RawPeerBundle) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            verifying_keys: VerifyingKeys {
                ed25519: ed25519::VerifyingKey::from_bytes(raw.ed25519),
                dilithium: dilithium::VerifyingKey::from_bytes(&raw.dilithium)?,
            },
            kem_public_key: KemPublicKey::new(
                x25519::PublicKey::from_bytes(raw.x25519),
                kyber::PublicKey::from_bytes(&raw.kyber)?,
            ),
        })
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Ed25519(#[from] SignatureError),

    #[error(transparent)]
    Dilithium(#[from] DilithiumError),

    #[error(transparent)]
    Kyber(#[from] KyberError),

    #[error("invalid dual signature length: {0} bytes")]
    InvalidSignatureLength(usize),

    #[error("could not encode peer bundle: {0}")]
    Encode(String),

    #[error("could not decode peer bundle: {0}")]
    Decode(String),
}
