//! Constant-time comparison
//!
//! Password digests are compared with [`digests_match`], never with `==`.
//! Early-exit comparison leaks how many leading bytes matched through
//! response timing; `subtle` takes the same time regardless of where (or if)
//! the inputs differ.

use subtle::ConstantTimeEq;

/// Compare two digests in constant time.
///
/// Slices of different length compare unequal; the length itself is not
/// secret for fixed-size Argon2 outputs.
///
/// ```rust
/// use tutorhub::crypto::digests_match;
///
/// assert!(digests_match(b"abc123", b"abc123"));
/// assert!(!digests_match(b"abc123", b"abc124"));
/// ```
pub fn digests_match(expected: &[u8], actual: &[u8]) -> bool {
    expected.ct_eq(actual).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_digests() {
        assert!(digests_match(&[7u8; 32], &[7u8; 32]));
        assert!(digests_match(b"", b""));
    }

    #[test]
    fn test_last_byte_differs() {
        let mut other = [7u8; 32];
        other[31] = 8;
        assert!(!digests_match(&[7u8; 32], &other));
    }

    #[test]
    fn test_different_lengths() {
        assert!(!digests_match(b"short", b"longer"));
    }
}
