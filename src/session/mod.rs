// SPDX-License-Identifier: MIT OR Apache-2.0

//! Continuously rekeying sessions between identities.
//!
//! A [`TxSession`] is created once per local identity. For every registered peer it owns one
//! outgoing ratchet and one [`RxSession`] which mirrors the ratchet the peer uses towards us:
//!
//! ```text
//!   alice: TxSession                         bob: TxSession
//!   ├─ ratchet(alice → bob)  ══ mirrors ══>  └─ RxSession(alice)
//!   │                                            └─ ratchet(alice → bob)
//!   └─ RxSession(bob)        <══ mirrors ══  ├─ ratchet(bob → alice)
//!       └─ ratchet(bob → alice)
//! ```
//!
//! Sending moves the symmetric chain of one ratchet. [`TxSession::generate_update`] rotates the
//! sender's hybrid key pair and folds fresh X25519 and Kyber768 material into the root chain of
//! every ratchet it owns, recovering from a past compromise of chain keys.
//!
//! Updates have to be processed in order. If two peers both generate an update before seeing the
//! other one's, each update was encapsulated to a public key its recipient already rotated and is
//! rejected with [`SessionError::PayloadTampered`].
mod error;
mod export;
mod rx;
mod tx;

pub use error::{CryptoError, SessionError, StateError};
pub use rx::{Received, RxSession};
pub use tx::TxSession;
