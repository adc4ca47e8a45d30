// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dilithium2 post-quantum detached signatures, in their standardised ML-DSA-44 form.
//!
//! Key generation takes its 32-byte seed from the injected [`Rng`], signing is deterministic.
use std::fmt;

use ml_dsa::signature::{Signer, Verifier};
use ml_dsa::{B32, EncodedSigningKey, EncodedVerifyingKey, KeyGen, MlDsa44};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{Rng, RngError, Secret};

pub const SIGNING_KEY_SIZE: usize = 2560;

pub const VERIFYING_KEY_SIZE: usize = 1312;

pub const SIGNATURE_SIZE: usize = 2420;

/// Generates a fresh Dilithium2 key pair from a 32-byte seed drawn from `rng`.
pub fn generate_keypair(rng: &Rng) -> Result<(VerifyingKey, SigningKey), RngError> {
    let seed = Secret::<32>::from_bytes(rng.random_array()?);
    let keypair = MlDsa44::key_gen_internal(&B32::from(*seed.as_bytes()));
    Ok((
        VerifyingKey(keypair.verifying_key().encode().to_vec()),
        SigningKey(Zeroizing::new(keypair.signing_key().encode().to_vec())),
    ))
}

#[derive(Clone)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DilithiumError> {
        if bytes.len() != SIGNING_KEY_SIZE {
            return Err(DilithiumError::InvalidLength("signing key", bytes.len()));
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn sign(&self, bytes: &[u8]) -> Result<Signature, DilithiumError> {
        let encoded = EncodedSigningKey::<MlDsa44>::try_from(self.as_bytes())
            .map_err(|_| DilithiumError::InvalidLength("signing key", self.0.len()))?;
        let signing_key = ml_dsa::SigningKey::<MlDsa44>::decode(&encoded);
        let signature: ml_dsa::Signature<MlDsa44> = signing_key
            .try_sign(bytes)
            .map_err(|_| DilithiumError::SigningFailed)?;
        Ok(Signature(signature.encode().to_vec()))
    }
}

impl PartialEq for SigningKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Eq for SigningKey {}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey").field(&"***").finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(Vec<u8>);

impl VerifyingKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DilithiumError> {
        if bytes.len() != VERIFYING_KEY_SIZE {
            return Err(DilithiumError::InvalidLength("verifying key", bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn verify(&self, bytes: &[u8], signature: &Signature) -> Result<(), DilithiumError> {
        let encoded = EncodedVerifyingKey::<MlDsa44>::try_from(self.as_bytes())
            .map_err(|_| DilithiumError::InvalidLength("verifying key", self.0.len()))?;
        let verifying_key = ml_dsa::VerifyingKey::<MlDsa44>::decode(&encoded);
        let signature = ml_dsa::Signature::<MlDsa44>::try_from(signature.as_bytes())
            .map_err(|_| DilithiumError::VerificationFailed)?;
        verifying_key
            .verify(bytes, &signature)
            .map_err(|_| DilithiumError::VerificationFailed)
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VerifyingKey")
            .field(&hex::encode(&self.as_bytes()[..8]))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DilithiumError> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(DilithiumError::InvalidLength("signature", bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature")
            .field(&hex::encode(&self.as_bytes()[..8]))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum DilithiumError {
    #[error("invalid dilithium2 {0} length: {1} bytes")]
    InvalidLength(&'static str, usize),

    #[error("dilithium2 signing failed")]
    SigningFailed,

    #[error("dilithium2 signature does not match public key and payload")]
    VerificationFailed,
}
