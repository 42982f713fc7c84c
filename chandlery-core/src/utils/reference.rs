//! Locally generated payment reference tokens.
//!
//! Cash and bank-transfer orders never touch an external provider, so
//! their payment reference is minted here: 10 random bytes rendered as
//! Crockford base32, prefixed with the rail, e.g. `CASH-9QJB2M5XTR8ZDF0G`.

use rand::RngCore;

/// Generate a unique local payment reference with the given prefix.
pub fn local_payment_ref(prefix: &str) -> String {
    let mut bytes = [0u8; 10];
    rand::rng().fill_bytes(&mut bytes);
    format!("{prefix}-{}", fast32::base32::CROCKFORD.encode(&bytes))
}
