// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodecError;
use crate::crypto::dilithium::DilithiumError;
use crate::crypto::hkdf::HkdfError;
use crate::crypto::kyber::KyberError;
use crate::crypto::xchacha20::XAeadError;
use crate::crypto::RngError;
use crate::hybrid::HybridError;
use crate::identity::IdentityError;
use crate::message::MessageError;
use crate::ratchet::RatchetId;

/// Error types for session operations.
///
/// Whenever one of these is returned the session was left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no ratchet registered for peer {0}")]
    UnknownPeer(Uuid),

    #[error("no session registered for sender {0}")]
    UnknownSender(Uuid),

    #[error("unknown ratchet {0}")]
    UnknownRatchet(RatchetId),

    #[error("peer {0} is already registered")]
    PeerExists(Uuid),

    #[error("message signature could not be verified")]
    AuthenticationFailed,

    #[error("payload failed authenticated decryption")]
    PayloadTampered,

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error("malformed session state: {0}")]
    MalformedState(#[from] StateError),

    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(#[from] RngError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Unexpected failure of a cryptographic primitive.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error(transparent)]
    Hkdf(#[from] HkdfError),

    #[error(transparent)]
    XAead(#[from] XAeadError),

    #[error(transparent)]
    Hybrid(HybridError),

    #[error(transparent)]
    Signature(IdentityError),
}

impl From<HybridError> for SessionError {
    fn from(err: HybridError) -> Self {
        match err {
            HybridError::PayloadTampered => SessionError::PayloadTampered,
            HybridError::Rng(err) => SessionError::RandomnessUnavailable(err),
            err => SessionError::Crypto(CryptoError::Hybrid(err)),
        }
    }
}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        SessionError::Crypto(CryptoError::Signature(err))
    }
}

impl From<HkdfError> for SessionError {
    fn from(err: HkdfError) -> Self {
        SessionError::Crypto(CryptoError::Hkdf(err))
    }
}

impl From<XAeadError> for SessionError {
    fn from(err: XAeadError) -> Self {
        SessionError::Crypto(CryptoError::XAead(err))
    }
}

/// Error types for decoding persisted session state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Kyber(#[from] KyberError),

    #[error(transparent)]
    Dilithium(#[from] DilithiumError),

    #[error("peer {0} appears more than once")]
    DuplicatePeer(Uuid),

    #[error("ratchet {0} appears more than once")]
    DuplicateRatchet(RatchetId),

    #[error("ratchet {0} does not belong to any registered peer")]
    OrphanRatchet(RatchetId),

    #[error("incoming ratchet {1} of peer {0} is not derived from the peer and local ids")]
    ForeignRatchet(Uuid, RatchetId),

    #[error("no outgoing ratchet for peer {0}")]
    MissingRatchet(Uuid),
}
