// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid X25519 and Kyber768 key exchange.
//!
//! Encapsulation draws two fresh 32-byte payload secrets. The DH payload is sealed with
//! XChaCha20-Poly1305 under a key derived from an X25519 agreement, the KEM payload is the
//! secret Kyber768 encapsulates towards the remote public key. Both are required to recover the
//! material, so an adversary needs to break X25519 and Kyber768 at the same time.
use thiserror::Error;

use crate::crypto::hkdf::{HkdfError, hkdf};
use crate::crypto::kyber::{self, KyberError};
use crate::crypto::x25519::{self, X25519Error};
use crate::crypto::xchacha20::{
    XAEAD_NONCE_SIZE, XAEAD_TAG_SIZE, XAeadError, XAeadKey, XAeadNonce, x_aead_decrypt,
    x_aead_encrypt,
};
use crate::crypto::{Rng, RngError, Secret};

/// Size of a fresh payload secret.
pub const PAYLOAD_SIZE: usize = 32;

/// Size of the sealed DH payload: nonce, encrypted payload and authentication tag.
pub const DH_CIPHERTEXT_SIZE: usize = XAEAD_NONCE_SIZE + PAYLOAD_SIZE + XAEAD_TAG_SIZE;

/// Size of the encoded public keys: X25519 followed by Kyber768.
pub const PUBLIC_KEY_SIZE: usize = x25519::PUBLIC_KEY_SIZE + kyber::PUBLIC_KEY_SIZE;

/// Size of the encoded secret keys: X25519 followed by Kyber768.
pub const SECRET_KEY_SIZE: usize = x25519::SECRET_KEY_SIZE + kyber::SECRET_KEY_SIZE;

/// Generates a hybrid key pair, both halves are seeded from `rng`.
pub fn generate_keypair(rng: &Rng) -> Result<(KemSecretKey, KemPublicKey), RngError> {
    let x25519 = x25519::SecretKey::from_bytes(rng.random_array()?);
    let (kyber_public, kyber) = kyber::generate_keypair(rng)?;
    let public_key = KemPublicKey {
        x25519: x25519.public_key(),
        kyber: kyber_public,
    };
    Ok((KemSecretKey { x25519, kyber }, public_key))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KemSecretKey {
    x25519: x25519::SecretKey,
    kyber: kyber::SecretKey,
}

impl KemSecretKey {
    pub fn new(x25519: x25519::SecretKey, kyber: kyber::SecretKey) -> Self {
        Self { x25519, kyber }
    }

    pub fn x25519(&self) -> &x25519::SecretKey {
        &self.x25519
    }

    pub fn kyber(&self) -> &kyber::SecretKey {
        &self.kyber
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KemPublicKey {
    x25519: x25519::PublicKey,
    kyber: kyber::PublicKey,
}

impl KemPublicKey {
    pub fn new(x25519: x25519::PublicKey, kyber: kyber::PublicKey) -> Self {
        Self { x25519, kyber }
    }

    pub fn x25519(&self) -> &x25519::PublicKey {
        &self.x25519
    }

    pub fn kyber(&self) -> &kyber::PublicKey {
        &self.kyber
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_SIZE);
        bytes.extend_from_slice(self.x25519.as_bytes());
        bytes.extend_from_slice(self.kyber.as_bytes());
        bytes
    }
}

/// DH and KEM halves of one hybrid encapsulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridCiphertext {
    pub dh: [u8; DH_CIPHERTEXT_SIZE],
    pub kem: kyber::Ciphertext,
}

/// Payload secrets recovered from a hybrid ciphertext.
#[derive(Debug, PartialEq, Eq)]
pub struct HybridSecret {
    pub dh: Secret<PAYLOAD_SIZE>,
    pub kem: Secret<PAYLOAD_SIZE>,
}

/// Encapsulates fresh payload secrets towards `remote`.
///
/// `info` separates the key sealing the DH payload between ratchet updates and pairings. `salt`
/// binds it to state both sides share already, ratchet updates pass the current root chain key so
/// an update can only ever be applied on top of the chain it was made for.
pub fn encapsulate(
    local: &x25519::SecretKey,
    remote: &KemPublicKey,
    salt: &[u8],
    info: &[u8],
    rng: &Rng,
) -> Result<(HybridCiphertext, HybridSecret), HybridError> {
    let key = derive_seal_key(local, &remote.x25519, salt, info)?;

    let dh_payload: [u8; PAYLOAD_SIZE] = rng.random_array()?;
    let nonce: XAeadNonce = rng.random_array()?;
    let sealed = x_aead_encrypt(&key, &dh_payload, nonce, None).map_err(HybridError::Encrypt)?;

    let mut dh = [0u8; DH_CIPHERTEXT_SIZE];
    dh[..XAEAD_NONCE_SIZE].copy_from_slice(&nonce);
    dh[XAEAD_NONCE_SIZE..].copy_from_slice(&sealed);

    let (kem_secret, kem) = remote.kyber.encapsulate(rng)?;

    Ok((
        HybridCiphertext { dh, kem },
        HybridSecret {
            dh: Secret::from_bytes(dh_payload),
            kem: kem_secret,
        },
    ))
}

/// Recovers the payload secrets `remote` encapsulated towards us.
pub fn decapsulate(
    local: &KemSecretKey,
    remote: &x25519::PublicKey,
    ciphertext: &HybridCiphertext,
    salt: &[u8],
    info: &[u8],
) -> Result<HybridSecret, HybridError> {
    let key = derive_seal_key(&local.x25519, remote, salt, info)?;

    let (nonce, sealed) = ciphertext.dh.split_at(XAEAD_NONCE_SIZE);
    let mut nonce_bytes: XAeadNonce = [0u8; XAEAD_NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);

    let dh_payload = x_aead_decrypt(&key, sealed, nonce_bytes, None)
        .map_err(|_| HybridError::PayloadTampered)?;
    let dh_payload: [u8; PAYLOAD_SIZE] = dh_payload
        .as_slice()
        .try_into()
        .map_err(|_| HybridError::PayloadTampered)?;

    let kem = local.kyber.decapsulate(&ciphertext.kem)?;

    Ok(HybridSecret {
        dh: Secret::from_bytes(dh_payload),
        kem,
    })
}

fn derive_seal_key(
    local: &x25519::SecretKey,
    remote: &x25519::PublicKey,
    salt: &[u8],
    info: &[u8],
) -> Result<XAeadKey, HybridError> {
    let shared = local.calculate_agreement(remote)?;
    Ok(hkdf(salt, shared.as_bytes(), Some(info))?)
}

#[derive(Debug, Error)]
pub enum HybridError {
    #[error("sealed dh payload failed authentication")]
    PayloadTampered,

    #[error("could not seal dh payload: {0}")]
    Encrypt(XAeadError),

    #[error(transparent)]
    Agreement(#[from] X25519Error),

    #[error(transparent)]
    KeyDerivation(#[from] HkdfError),

    #[error(transparent)]
    Kem(KyberError),

    #[error(transparent)]
    Rng(#[from] RngError),
}

impl From<KyberError> for HybridError {
    fn from(err: KyberError) -> Self {
        match err {
            KyberError::Rng(err) => HybridError::Rng(err),
            err => HybridError::Kem(err),
        }
    }
}
