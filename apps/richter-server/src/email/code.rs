//! Verification code generation.

use rand::Rng;
use richter_storage::VerificationCode;

/// Generate a uniformly random 8-digit verification code from the thread-local CSPRNG.
pub fn generate_verification_code() -> VerificationCode {
    let mut rng = rand::rng();
    VerificationCode::wrapping(rng.random_range(0..VerificationCode::UPPER))
}
