//! Single-shot switch verification
//!
//! Pulses the actuator once and confirms the move with a position sensor,
//! without blocking: start with [`SwitchVerifier::verify_switch`], then
//! call [`SwitchVerifier::poll`] every tick until it resolves.

pub mod verifier;

pub use verifier::{
    SwitchVerifier, VerificationAttempt, VerifyError, VerifyOutcome, VerifyPhase, VerifyPoll,
    VerifyRequest, STABILIZATION_MS,
};
