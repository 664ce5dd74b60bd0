//! Threshold secret-sharing codec (C2): Shamir shares over [`FieldElement`]s.
//!
//! A proposer's secret becomes the constant term of a degree `k-1`
//! polynomial; the remaining coefficients are drawn from a deterministic,
//! portable PRNG seeded by the secret itself. Every honest node that knows
//! the secret can therefore reproduce the exact shares the proposer should
//! have sent, and validate a delivered share against that prediction without
//! an extra commit/reveal round (spec.md section 9).

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::field::{FieldElement, FieldError, P};

/// One point `(x, y)` on a proposer's sharing polynomial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Share {
    /// The share's abscissa, in `1..=n`.
    pub x: u32,
    /// The share's ordinate, `f(x)`.
    pub y: FieldElement,
}

/// Failures raised by [`encode`] and [`decode`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The secret did not fit in `[0, P)`.
    #[error("secret out of range: {0}")]
    SecretOutOfRange(#[from] FieldError),
    /// `k` was `0` or exceeded `n`.
    #[error("invalid threshold: k={k}, n={n}")]
    InvalidThreshold { k: u32, n: u32 },
    /// Fewer than `k` shares were supplied to `decode`.
    #[error("insufficient shares: need {needed}, got {got}")]
    InsufficientShares { needed: usize, got: usize },
    /// Two shares among the ones used for reconstruction share an abscissa.
    #[error("duplicate share abscissa: {0}")]
    DuplicateAbscissa(u32),
}

/// Builds a 32-byte ChaCha20 seed deterministically from a secret's canonical
/// value. Repeating the secret's 16 bytes twice keeps the derivation a pure,
/// portable function of the secret alone -- no hashing dependency needed for
/// determinism.
fn seed_from_secret(secret: FieldElement) -> [u8; 32] {
    let bytes = secret.value().to_le_bytes();
    let mut seed = [0u8; 32];
    seed[..16].copy_from_slice(&bytes);
    seed[16..].copy_from_slice(&bytes);
    seed
}

fn eval_polynomial(coeffs: &[FieldElement], x: FieldElement) -> FieldElement {
    let mut result = FieldElement::ZERO;
    let mut power = FieldElement::ONE;
    for &c in coeffs {
        result = result.add(c.mul(power));
        power = power.mul(x);
    }
    result
}

/// Splits `secret` into `n` shares, any `k` of which reconstruct it.
///
/// `coeffs[0] = secret`; `coeffs[1..k]` are drawn from a PRNG seeded
/// deterministically by `secret`, so re-running `encode` with the same
/// secret always yields the same shares (spec.md section 4.2).
pub fn encode(secret: u128, n: u32, k: u32) -> Result<Vec<Share>, CodecError> {
    let secret = FieldElement::new(secret)?;
    if k == 0 || k > n {
        return Err(CodecError::InvalidThreshold { k, n });
    }

    let mut rng = ChaCha20Rng::from_seed(seed_from_secret(secret));
    let mut coeffs = Vec::with_capacity(k as usize);
    coeffs.push(secret);
    for _ in 1..k {
        let raw = rng.next_u64() as u128 | ((rng.next_u64() as u128) << 64);
        coeffs.push(FieldElement::new(raw % P).expect("reduced value fits in the field"));
    }

    let mut shares = Vec::with_capacity(n as usize);
    for x in 1..=n {
        let xi = FieldElement::new(x as u128).expect("x < n fits in the field");
        shares.push(Share {
            x,
            y: eval_polynomial(&coeffs, xi),
        });
    }
    Ok(shares)
}

/// Reconstructs the secret from the first `k` of `shares` via Lagrange
/// interpolation at `x = 0`.
pub fn decode(shares: &[Share], k: usize) -> Result<FieldElement, CodecError> {
    if shares.len() < k {
        return Err(CodecError::InsufficientShares {
            needed: k,
            got: shares.len(),
        });
    }
    let used = &shares[..k];
    for (i, a) in used.iter().enumerate() {
        for b in &used[i + 1..] {
            if a.x == b.x {
                return Err(CodecError::DuplicateAbscissa(a.x));
            }
        }
    }

    let mut total = FieldElement::ZERO;
    for (i, share_i) in used.iter().enumerate() {
        let xi = FieldElement::new(share_i.x as u128).expect("abscissa fits in the field");
        let mut num = FieldElement::ONE;
        let mut den = FieldElement::ONE;
        for (j, share_j) in used.iter().enumerate() {
            if i == j {
                continue;
            }
            let xj = FieldElement::new(share_j.x as u128).expect("abscissa fits in the field");
            num = num.mul(xj.neg());
            den = den.mul(xi.sub(xj));
        }
        total = total.add(share_i.y.mul(num).mul(den.inv()));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_deterministic() {
        let a = encode(2025, 4, 2).unwrap();
        let b = encode(2025, 4, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_rejects_bad_threshold() {
        assert_eq!(
            encode(1, 4, 0),
            Err(CodecError::InvalidThreshold { k: 0, n: 4 })
        );
        assert_eq!(
            encode(1, 4, 5),
            Err(CodecError::InvalidThreshold { k: 5, n: 4 })
        );
    }

    #[test]
    fn encode_rejects_out_of_range_secret() {
        assert!(encode(P, 4, 2).is_err());
    }

    #[test]
    fn round_trip_reconstructs_secret() {
        for &secret in &[0u128, 1, 2025, P - 1] {
            let shares = encode(secret, 7, 3).unwrap();
            let recovered = decode(&shares, 3).unwrap();
            assert_eq!(recovered.value(), secret, "secret {secret} failed to round-trip");
        }
    }

    #[test]
    fn any_k_subset_reconstructs() {
        let shares = encode(424242, 6, 3).unwrap();
        let subset = vec![shares[1], shares[3], shares[5]];
        assert_eq!(decode(&subset, 3).unwrap().value(), 424242);
    }

    #[test]
    fn under_threshold_is_rejected() {
        let shares = encode(99, 5, 3).unwrap();
        let err = decode(&shares[..2], 3).unwrap_err();
        assert_eq!(
            err,
            CodecError::InsufficientShares { needed: 3, got: 2 }
        );
    }

    #[test]
    fn duplicate_abscissa_is_rejected() {
        let shares = encode(99, 5, 3).unwrap();
        let dup = vec![shares[0], shares[0], shares[1]];
        assert_eq!(decode(&dup, 3).unwrap_err(), CodecError::DuplicateAbscissa(1));
    }

    #[cfg(test)]
    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_holds_for_any_secret_and_k_subset(
                secret in 0u128..P,
                n in 1u32..12,
            ) {
                let k = (n / 2 + 1).max(1).min(n);
                let shares = encode(secret, n, k).unwrap();
                prop_assert_eq!(decode(&shares, k as usize).unwrap().value(), secret);
            }
        }
    }
}
