// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic algorithms and secure random number provider.
//!
//! Following algorithms are used:
//! * ChaCha random number generator with 20 rounds
//! * XChaCha20-Poly1305 AEAD
//! * HKDF and HMAC with SHA256
//! * ECDH key agreement with X25519
//! * Kyber768 key encapsulation in its ML-KEM-768 form
//! * EdDSA related to Curve25519 with SHA-512
//! * Dilithium2 signatures in their ML-DSA-44 form
pub mod dilithium;
pub mod ed25519;
pub mod hkdf;
pub mod hmac;
pub mod kyber;
mod rng;
mod secret;
pub mod x25519;
pub mod xchacha20;

pub use rng::{Rng, RngError};
pub use secret::Secret;
