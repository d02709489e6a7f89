//! Identifier space shared by peers and files
//!
//! Peers and files are placed on the same 32 bit circle.
//! A peer identifier is the hash of `host:port`, a file identifier is the hash of the filename,
//! so both can be compared directly when routing.

use sha2::{Digest, Sha256};

/// Position on the identifier circle
pub type Identifier = u32;

/// Maps an arbitrary string onto the identifier circle
///
/// Takes the [SHA-256](https://docs.rs/sha2/0.10.8/sha2/) digest of the input
/// and folds its first four bytes, most significant byte first, into a `u32`.
/// Distinct inputs may collide; nothing here tries to prevent that.
pub fn hash_identifier(input: &str) -> Identifier {
    let digest = Sha256::digest(input.as_bytes());
    digest
        .iter()
        .take(4)
        .fold(0, |acc, byte| (acc << 8) | *byte as Identifier)
}

/// Checks whether `value` lies in the open-closed interval `(lower, upper]` on the circle
///
/// If `upper <= lower` the interval wraps past the maximum value.
/// `lower == upper` therefore covers the whole circle.
pub fn is_between_on_ring(value: Identifier, lower: Identifier, upper: Identifier) -> bool {
    if lower < upper {
        value > lower && value <= upper
    } else {
        value > lower || value <= upper // Wrap-around
    }
}
