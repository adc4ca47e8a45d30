// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot hybrid key agreement bootstrapping trust between two identities.
//!
//! The initiator encapsulates towards the responder's ephemeral public key, both derive the same
//! 32-byte pairing secret and compare a [`fingerprint`] out-of-band. The secret then seeds the
//! ratchets of both sessions, see `TxSession::add_peer`.
//!
//! The ciphertext is framed as `u32 length || dh ciphertext || u32 length || kyber768
//! ciphertext`, both lengths are checked against the fixed sizes when decoding.
mod ephemeral;
mod fingerprint;

use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, Reader};
use crate::crypto::hmac::hmac_sha256;
use crate::crypto::kyber::{self, KyberError};
use crate::crypto::{Rng, RngError, Secret};
use crate::hybrid::{self, DH_CIPHERTEXT_SIZE, HybridCiphertext, HybridError, HybridSecret};
use crate::protocol::{PAIRING_DH_INFO, PAIRING_HMAC};

pub use ephemeral::{
    EPHEMERAL_PUBLIC_KEY_SIZE, EPHEMERAL_SECRET_KEY_SIZE, EphemeralPublicKey, EphemeralSecretKey,
    generate_keypair,
};
pub use fingerprint::fingerprint;

/// Size of an encoded pairing ciphertext.
pub const PAIRING_CIPHERTEXT_SIZE: usize = 4 + DH_CIPHERTEXT_SIZE + 4 + kyber::CIPHERTEXT_SIZE;

/// Encapsulates fresh material towards `remote` and derives the pairing secret.
///
/// Returns the encoded ciphertext which needs to be sent to the responder.
pub fn initiate(
    local: &EphemeralSecretKey,
    remote: &EphemeralPublicKey,
    rng: &Rng,
) -> Result<(Vec<u8>, Secret<32>), PairingError> {
    let (ciphertext, secret) = hybrid::encapsulate(
        local.kem_secret_key().x25519(),
        remote.kem_public_key(),
        b"",
        PAIRING_DH_INFO,
        rng,
    )?;
    let shared_secret = pairing_secret(&ciphertext, &secret);
    debug!("initiated ephemeral pairing");
    Ok((encode_ciphertext(&ciphertext), shared_secret))
}

/// Recovers the pairing secret from the initiator's ciphertext.
pub fn respond(
    local: &EphemeralSecretKey,
    remote: &EphemeralPublicKey,
    ciphertext: &[u8],
) -> Result<Secret<32>, PairingError> {
    let ciphertext = decode_ciphertext(ciphertext)?;
    let secret = hybrid::decapsulate(
        local.kem_secret_key(),
        remote.kem_public_key().x25519(),
        &ciphertext,
        b"",
        PAIRING_DH_INFO,
    )?;
    debug!("responded to ephemeral pairing");
    Ok(pairing_secret(&ciphertext, &secret))
}

fn pairing_secret(ciphertext: &HybridCiphertext, secret: &HybridSecret) -> Secret<32> {
    Secret::from_bytes(hmac_sha256(
        &[secret.dh.as_bytes(), secret.kem.as_bytes()],
        &[&[PAIRING_HMAC], &ciphertext.dh, ciphertext.kem.as_bytes()],
    ))
}

fn encode_ciphertext(ciphertext: &HybridCiphertext) -> Vec<u8> {
    let kem = ciphertext.kem.as_bytes();
    let mut bytes = Vec::with_capacity(PAIRING_CIPHERTEXT_SIZE);
    bytes.extend_from_slice(&(ciphertext.dh.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&ciphertext.dh);
    bytes.extend_from_slice(&(kem.len() as u32).to_be_bytes());
    bytes.extend_from_slice(kem);
    bytes
}

fn decode_ciphertext(bytes: &[u8]) -> Result<HybridCiphertext, PairingError> {
    let mut reader = Reader::new(bytes);

    let dh_len = reader.read_u32()? as usize;
    if dh_len != DH_CIPHERTEXT_SIZE {
        return Err(PairingError::InvalidFraming(dh_len));
    }
    let dh = reader.read_array()?;

    let kem_len = reader.read_u32()? as usize;
    if kem_len != kyber::CIPHERTEXT_SIZE {
        return Err(PairingError::InvalidFraming(kem_len));
    }
    let kem = kyber::Ciphertext::from_bytes(reader.read_slice(kem_len)?)?;
    reader.finish()?;

    Ok(HybridCiphertext { dh, kem })
}

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("invalid ephemeral key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("pairing ciphertext announces unexpected length {0}")]
    InvalidFraming(usize),

    #[error("sealed pairing payload failed authentication")]
    PayloadTampered,

    #[error("could not compute fingerprint: {0}")]
    Fingerprint(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Kyber(#[from] KyberError),

    #[error(transparent)]
    Hybrid(HybridError),

    #[error(transparent)]
    Rng(#[from] RngError),
}

impl From<HybridError> for PairingError {
    fn from(err: HybridError) -> Self {
        match err {
            HybridError::PayloadTampered => PairingError::PayloadTampered,
            HybridError::Rng(err) => PairingError::Rng(err),
            err => PairingError::Hybrid(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::{
        PAIRING_CIPHERTEXT_SIZE, PairingError, fingerprint, generate_keypair, initiate, respond,
    };

    #[test]
    fn initiate_respond() {
        let rng = Rng::from_seed([1; 32]);

        let (alice_secret, alice_public) = generate_keypair(&rng).unwrap();
        let (bob_secret, bob_public) = generate_keypair(&rng).unwrap();

        let (ciphertext, alice_shared) = initiate(&alice_secret, &bob_public, &rng).unwrap();
        assert_eq!(ciphertext.len(), PAIRING_CIPHERTEXT_SIZE);

        let bob_shared = respond(&bob_secret, &alice_public, &ciphertext).unwrap();
        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn fingerprints_match() {
        let rng = Rng::from_seed([2; 32]);

        let (alice_secret, alice_public) = generate_keypair(&rng).unwrap();
        let (bob_secret, bob_public) = generate_keypair(&rng).unwrap();

        let (ciphertext, alice_shared) = initiate(&alice_secret, &bob_public, &rng).unwrap();
        let bob_shared = respond(&bob_secret, &alice_public, &ciphertext).unwrap();

        let alice_fingerprint = fingerprint(&alice_secret, &bob_public, &alice_shared).unwrap();
        let bob_fingerprint = fingerprint(&bob_secret, &alice_public, &bob_shared).unwrap();
        assert_eq!(alice_fingerprint, bob_fingerprint);

        assert_eq!(alice_fingerprint.len(), 36 + 8);
        assert_eq!(alice_fingerprint.split(' ').count(), 9);
        assert!(alice_fingerprint.split(' ').all(|group| group.len() == 4));
    }

    #[test]
    fn intercepted_pairing_changes_fingerprint() {
        let rng = Rng::from_seed([3; 32]);

        let (alice_secret, _) = generate_keypair(&rng).unwrap();
        let (bob_secret, _) = generate_keypair(&rng).unwrap();

        // Mallory hands out her own keys to both sides.
        let (_, mallory_public_1) = generate_keypair(&rng).unwrap();
        let (_, mallory_public_2) = generate_keypair(&rng).unwrap();

        let (_, alice_shared) = initiate(&alice_secret, &mallory_public_1, &rng).unwrap();
        let (_, bob_shared) = initiate(&bob_secret, &mallory_public_2, &rng).unwrap();

        let alice_fingerprint =
            fingerprint(&alice_secret, &mallory_public_1, &alice_shared).unwrap();
        let bob_fingerprint = fingerprint(&bob_secret, &mallory_public_2, &bob_shared).unwrap();
        assert_ne!(alice_fingerprint, bob_fingerprint);
    }

    #[test]
    fn reject_tampered_and_misframed_ciphertext() {
        let rng = Rng::from_seed([4; 32]);

        let (alice_secret, alice_public) = generate_keypair(&rng).unwrap();
        let (bob_secret, bob_public) = generate_keypair(&rng).unwrap();

        let (ciphertext, _) = initiate(&alice_secret, &bob_public, &rng).unwrap();

        let mut tampered = ciphertext.clone();
        tampered[10] ^= 1;
        assert!(matches!(
            respond(&bob_secret, &alice_public, &tampered),
            Err(PairingError::PayloadTampered)
        ));

        let mut misframed = ciphertext.clone();
        misframed[3] = 71;
        assert!(matches!(
            respond(&bob_secret, &alice_public, &misframed),
            Err(PairingError::InvalidFraming(71))
        ));

        assert!(matches!(
            respond(&bob_secret, &alice_public, &ciphertext[..ciphertext.len() - 1]),
            Err(PairingError::Codec(_))
        ));
    }
}
