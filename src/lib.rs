// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tungsten` is a continuously rekeying double-ratchet for two-party messaging which stays
//! secure as long as either its classical or its post-quantum primitives hold.
//!
//! ## Building blocks
//!
//! Every direction between two identities is one [`Ratchet`]: a symmetric chain which is advanced
//! with HMAC-SHA256 for every message and gives forward secrecy, and a root chain which folds in
//! fresh key-exchange material and gives post-compromise security.
//!
//! Fresh root material is exchanged with a hybrid KEM. An X25519 agreement seals one random
//! payload with XChaCha20-Poly1305 and Kyber768 encapsulates a second one, both payloads go into
//! the root chain. Every message carries an Ed25519 and a Dilithium2 signature and is only
//! accepted when both verify.
//!
//! ## Sessions
//!
//! A [`TxSession`] represents one local identity. Peers are registered with the public
//! [`PeerBundle`] of the other side and a secret agreed on during an ephemeral [`pairing`], whose
//! fingerprint both users compare out-of-band:
//!
//! ```no_run
//! use tungsten::pairing::{fingerprint, generate_keypair, initiate, respond};
//! use tungsten::{Received, Rng, TxSession};
//! use uuid::Uuid;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rng = Rng::from_os_rng()?;
//! let mut alice = TxSession::generate(Uuid::from_u128(1), &rng)?;
//! let mut bob = TxSession::generate(Uuid::from_u128(2), &rng)?;
//!
//! // Pairing, usually both sides run this on their own device.
//! let (alice_ephemeral, alice_ephemeral_public) = generate_keypair(&rng)?;
//! let (bob_ephemeral, bob_ephemeral_public) = generate_keypair(&rng)?;
//! let (ciphertext, alice_secret) = initiate(&alice_ephemeral, &bob_ephemeral_public, &rng)?;
//! let bob_secret = respond(&bob_ephemeral, &alice_ephemeral_public, &ciphertext)?;
//! assert_eq!(
//!     fingerprint(&alice_ephemeral, &bob_ephemeral_public, &alice_secret)?,
//!     fingerprint(&bob_ephemeral, &alice_ephemeral_public, &bob_secret)?,
//! );
//!
//! alice.add_peer(bob.public_bundle(), &alice_secret)?;
//! bob.add_peer(alice.public_bundle(), &bob_secret)?;
//!
//! // Rekey every ratchet of alice, bob needs to apply the update before new messages arrive.
//! let update = alice.generate_update(&rng)?;
//! bob.receive(&update)?;
//!
//! let message = alice.send(&bob.id(), b"hello", &rng)?;
//! assert_eq!(bob.receive(&message)?, Received::Plaintext(b"hello".to_vec()));
//! # Ok(())
//! # }
//! ```
//!
//! Sessions are plain values without interior synchronization, all calls touching the same
//! session need to be serialized by the caller. State can be persisted with
//! [`TxSession::export`] and restored with [`TxSession::import`].
mod codec;
pub mod crypto;
pub mod hybrid;
pub mod identity;
pub mod message;
pub mod pairing;
pub mod protocol;
pub mod ratchet;
pub mod session;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use codec::CodecError;
pub use crypto::{Rng, RngError, Secret};
pub use identity::PeerBundle;
pub use ratchet::{Ratchet, RatchetId};
pub use session::{Received, RxSession, SessionError, TxSession};
