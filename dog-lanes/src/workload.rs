//! The stand-in workload: a pure, CPU-bound numeric function.
//!
//! `fib(1) = 0`, `fib(2) = 1`, `fib(k) = fib(k - 1) + fib(k - 2)`.

use num_bigint::BigUint;

/// Compute the workload for `n`. Returns `None` for `n == 0`.
pub fn fib(n: u64) -> Option<BigUint> {
    if n == 0 {
        return None;
    }

    let (mut prev, mut curr) = (BigUint::from(0u32), BigUint::from(1u32));
    if n == 1 {
        return Some(prev);
    }

    for _ in 2..n {
        let next = &prev + &curr;
        prev = std::mem::replace(&mut curr, next);
    }
    Some(curr)
}
