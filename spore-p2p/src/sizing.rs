//! Quorum sizing from the intersection probability of two random witness sets.
//!
//! There is no global order of transactions, so two conflicting spends are
//! caught only if their quorums share a witness. For `N` known nodes we pick
//! the smallest `k` such that two independent uniform samples of size `k`
//! intersect with probability at least `p`:
//!
//! ```text
//! P(k) = 1 - C(N-k, k) / C(N, k)
//! ```
//!
//! Binomials are computed over arbitrary-precision integers, since `C(N, k)`
//! overflows `u64` long before realistic network sizes.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Fixed-point scale for the `C(N-K,S) / C(N,S)` ratio.
const RATIO_SCALE: u64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    /// Target probability that two quorums share a member.
    pub intersection_probability: f64,
    /// Floor applied to the computed size.
    pub min_quorum_size: usize,
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            intersection_probability: 0.99,
            min_quorum_size: 10,
        }
    }
}

/// `C(n, k)`, zero when `k > n`.
pub fn binomial(n: u64, k: u64) -> BigUint {
    if k > n {
        return BigUint::zero();
    }
    let k = k.min(n - k);
    let mut acc = BigUint::one();
    for i in 0..k {
        // acc == C(n, i) here, so the division is exact
        acc = acc * BigUint::from(n - i) / BigUint::from(i + 1);
    }
    acc
}

/// Probability that a fixed set of `k` nodes meets a uniform sample of `s`
/// out of `n`: `1 - C(n-k, s) / C(n, s)`.
pub fn intersection_probability(n: usize, k: usize, s: usize) -> f64 {
    let total = binomial(n as u64, s as u64);
    if total.is_zero() {
        return 1.0;
    }
    let disjoint = binomial(n.saturating_sub(k) as u64, s as u64);
    let scaled = disjoint * BigUint::from(RATIO_SCALE) / total;
    let ratio = scaled.to_f64().unwrap_or(0.0) / RATIO_SCALE as f64;
    1.0 - ratio
}

/// Smallest `k` with `P(k) >= p` among `nodes` total nodes, floored at the policy minimum.
pub fn quorum_size(nodes: usize, policy: &QuorumPolicy) -> usize {
    let mut k = 0;
    while k < nodes && intersection_probability(nodes, k, k) < policy.intersection_probability {
        k += 1;
    }
    k.max(policy.min_quorum_size)
}
