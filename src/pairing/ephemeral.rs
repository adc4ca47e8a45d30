// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-use hybrid key pairs for pairing two identities.
//!
//! Encodings are fixed-size: the secret key is `x25519 || kyber768 secret || kyber768 public`,
//! the public key is `x25519 || kyber768 public`.
use crate::codec::Reader;
use crate::crypto::{Rng, kyber, x25519};
use crate::hybrid::{self, KemPublicKey, KemSecretKey};
use crate::pairing::PairingError;

pub const EPHEMERAL_PUBLIC_KEY_SIZE: usize = hybrid::PUBLIC_KEY_SIZE;

pub const EPHEMERAL_SECRET_KEY_SIZE: usize = hybrid::SECRET_KEY_SIZE + kyber::PUBLIC_KEY_SIZE;

/// Fresh ephemeral key pair, disjoint from any session identity keys.
pub fn generate_keypair(
    rng: &Rng,
) -> Result<(EphemeralSecretKey, EphemeralPublicKey), PairingError> {
    let (secret_key, public_key) = hybrid::generate_keypair(rng)?;
    Ok((
        EphemeralSecretKey {
            secret_key,
            public_key: public_key.clone(),
        },
        EphemeralPublicKey(public_key),
    ))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EphemeralSecretKey {
    secret_key: KemSecretKey,
    public_key: KemPublicKey,
}

impl EphemeralSecretKey {
    pub fn public_key(&self) -> EphemeralPublicKey {
        EphemeralPublicKey(self.public_key.clone())
    }

    pub(crate) fn kem_secret_key(&self) -> &KemSecretKey {
        &self.secret_key
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EPHEMERAL_SECRET_KEY_SIZE);
        bytes.extend_from_slice(self.secret_key.x25519().as_bytes());
        bytes.extend_from_slice(self.secret_key.kyber().as_bytes());
        bytes.extend_from_slice(self.public_key.kyber().as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PairingError> {
        if bytes.len() != EPHEMERAL_SECRET_KEY_SIZE {
            return Err(PairingError::InvalidKeyLength(bytes.len()));
        }
        let mut reader = Reader::new(bytes);
        let x25519 = x25519::SecretKey::from_bytes(reader.read_array()?);
        let kyber_secret =
            kyber::SecretKey::from_bytes(reader.read_slice(kyber::SECRET_KEY_SIZE)?)?;
        let kyber_public =
            kyber::PublicKey::from_bytes(reader.read_slice(kyber::PUBLIC_KEY_SIZE)?)?;
        reader.finish()?;

        let public_key = KemPublicKey::new(x25519.public_key(), kyber_public);
        Ok(Self {
            secret_key: KemSecretKey::new(x25519, kyber_secret),
            public_key,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EphemeralPublicKey(KemPublicKey);

impl EphemeralPublicKey {
    pub(crate) fn kem_public_key(&self) -> &KemPublicKey {
        &self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PairingError> {
        if bytes.len() != EPHEMERAL_PUBLIC_KEY_SIZE {
            return Err(PairingError::InvalidKeyLength(bytes.len()));
        }
        let mut reader = Reader::new(bytes);
        let x25519 = x25519::PublicKey::from_bytes(reader.read_array()?);
        let kyber = kyber::PublicKey::from_bytes(reader.read_slice(kyber::PUBLIC_KEY_SIZE)?)?;
        reader.finish()?;
        Ok(Self(KemPublicKey::new(x25519, kyber)))
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::pairing::PairingError;

    use super::{
        EPHEMERAL_PUBLIC_KEY_SIZE, EPHEMERAL_SECRET_KEY_SIZE, EphemeralPublicKey,
        EphemeralSecretKey, generate_keypair,
    };

    #[test]
    fn encode_decode_keys() {
        let rng = Rng::from_seed([1; 32]);
        let (secret_key, public_key) = generate_keypair(&rng).unwrap();

        let secret_bytes = secret_key.to_bytes();
        let public_bytes = public_key.to_bytes();
        assert_eq!(secret_bytes.len(), EPHEMERAL_SECRET_KEY_SIZE);
        assert_eq!(public_bytes.len(), EPHEMERAL_PUBLIC_KEY_SIZE);

        let decoded = EphemeralSecretKey::from_bytes(&secret_bytes).unwrap();
        assert_eq!(decoded, secret_key);
        assert_eq!(decoded.public_key(), public_key);
        assert_eq!(EphemeralPublicKey::from_bytes(&public_bytes).unwrap(), public_key);
    }

    #[test]
    fn reject_wrong_lengths() {
        let rng = Rng::from_seed([2; 32]);
        let (secret_key, public_key) = generate_keypair(&rng).unwrap();

        let secret_bytes = secret_key.to_bytes();
        assert!(matches!(
            EphemeralSecretKey::from_bytes(&secret_bytes[1..]),
            Err(PairingError::InvalidKeyLength(_))
        ));

        let mut public_bytes = public_key.to_bytes();
        public_bytes.push(0);
        assert!(matches!(
            EphemeralPublicKey::from_bytes(&public_bytes),
            Err(PairingError::InvalidKeyLength(_))
        ));
    }
}
