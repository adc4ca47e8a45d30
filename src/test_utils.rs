// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for testing applications built on top of sessions.
use uuid::Uuid;

use crate::crypto::Rng;
use crate::pairing;
use crate::session::TxSession;

/// Id of the first identity created by [`paired_sessions`].
pub const ALICE: Uuid = Uuid::from_u128(0xa11ce);

/// Id of the second identity created by [`paired_sessions`].
pub const BOB: Uuid = Uuid::from_u128(0xb0b);

/// Installs a log subscriber when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Runs an ephemeral pairing between two fresh identities and registers them with each other.
pub fn paired_sessions(rng: &Rng) -> (TxSession, TxSession) {
    let mut alice = TxSession::generate(ALICE, rng).unwrap();
    let mut bob = TxSession::generate(BOB, rng).unwrap();
    pair(&mut alice, &mut bob, rng);
    (alice, bob)
}

/// Pairs two existing identities, the first one initiates.
pub fn pair(initiator: &mut TxSession, responder: &mut TxSession, rng: &Rng) {
    let (initiator_secret, initiator_public) = pairing::generate_keypair(rng).unwrap();
    let (responder_secret, responder_public) = pairing::generate_keypair(rng).unwrap();

    let (ciphertext, initiator_shared) =
        pairing::initiate(&initiator_secret, &responder_public, rng).unwrap();
    let responder_shared =
        pairing::respond(&responder_secret, &initiator_public, &ciphertext).unwrap();

    initiator
        .add_peer(responder.public_bundle(), &initiator_shared)
        .unwrap();
    responder
        .add_peer(initiator.public_bundle(), &responder_shared)
        .unwrap();
}
