//! Deterministic generators for the stock benchmark groups.
//!
//! A generator is a pure function of its parameters: the same set yields the
//! same benchmark ids in the same order, so a re-run shows up as a duplicate
//! when ids are compared across groups.

use serde::{Deserialize, Serialize};

use crate::{Benchmark, DriftError, Result};

pub const CANONICAL_SET_VERSION: u32 = 1;

/// Upper bound used by the stock prime set.
pub const PRIME_SET_UPPER: u64 = 30;

/// Largest batch a single generator call may produce.
pub const MAX_SET_SIZE: u64 = 10_000;

/// Widest inclusive range a counting benchmark may cover.
pub const MAX_RANGE_WIDTH: u64 = 10_000;

/// Ranges used by the stock happy number counting set.
pub const HAPPY_NUMBER_RANGES: &[(u64, u64)] = &[
    (172, 191),
    (1021, 1050),
    (2345, 2360),
    (3103, 3120),
    (4477, 4500),
    (5210, 5231),
    (6480, 6495),
    (7019, 7044),
    (8888, 8910),
    (9637, 9660),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "set", rename_all = "snake_case")]
pub enum CanonicalSet {
    /// One prime benchmark for every n in `2..=up_to`.
    Primes { up_to: u64 },
    /// One counting benchmark per inclusive range.
    CountingHappyNumbers { ranges: Vec<(u64, u64)> },
}

impl CanonicalSet {
    pub fn primes() -> Self {
        CanonicalSet::Primes {
            up_to: PRIME_SET_UPPER,
        }
    }

    pub fn counting_happy_numbers() -> Self {
        CanonicalSet::CountingHappyNumbers {
            ranges: HAPPY_NUMBER_RANGES.to_vec(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CanonicalSet::Primes { .. } => "Prime numbers".to_string(),
            CanonicalSet::CountingHappyNumbers { .. } => "Counting happy numbers".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            CanonicalSet::Primes { up_to } => format!(
                "Checks whether the LLM can tell which numbers from 2 to {} are prime (v{}).",
                up_to, CANONICAL_SET_VERSION
            ),
            CanonicalSet::CountingHappyNumbers { ranges } => format!(
                "Checks whether the LLM can count happy numbers in {} ranges (v{}).",
                ranges.len(),
                CANONICAL_SET_VERSION
            ),
        }
    }

    /// Build the batch, failing before anything is constructed if the
    /// parameters are unusable.
    pub fn benchmarks(&self) -> Result<Vec<Benchmark>> {
        match self {
            CanonicalSet::Primes { up_to } => {
                if *up_to < 2 {
                    return Err(DriftError::InvalidBenchmark(format!(
                        "prime set needs an upper bound of at least 2, got {}",
                        up_to
                    )));
                }
                if *up_to - 1 > MAX_SET_SIZE {
                    return Err(DriftError::InvalidBenchmark(format!(
                        "prime set up to {} exceeds {} benchmarks",
                        up_to, MAX_SET_SIZE
                    )));
                }
                (2..=*up_to).map(|n| Benchmark::prime(n, is_prime(n))).collect()
            }
            CanonicalSet::CountingHappyNumbers { ranges } => {
                if ranges.is_empty() {
                    return Err(DriftError::InvalidBenchmark(
                        "happy number set needs at least one range".to_string(),
                    ));
                }
                if ranges.len() as u64 > MAX_SET_SIZE {
                    return Err(DriftError::InvalidBenchmark(format!(
                        "{} ranges exceed {} benchmarks",
                        ranges.len(),
                        MAX_SET_SIZE
                    )));
                }
                ranges
                    .iter()
                    .map(|&(start, end)| Benchmark::counting_happy_numbers_in(start, end))
                    .collect()
            }
        }
    }
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

fn sum_of_squared_digits(mut n: u64) -> u64 {
    let mut sum = 0;
    while n > 0 {
        let digit = n % 10;
        sum += digit * digit;
        n /= 10;
    }
    sum
}

/// Floyd cycle detection on the digit-square map.
pub fn is_happy(n: u64) -> bool {
    if n == 0 {
        return false;
    }
    let mut slow = n;
    let mut fast = n;
    loop {
        slow = sum_of_squared_digits(slow);
        fast = sum_of_squared_digits(sum_of_squared_digits(fast));
        if slow == fast {
            break;
        }
    }
    slow == 1
}

pub fn count_happy_numbers(start: u64, end: u64) -> u64 {
    (start..=end).filter(|&n| is_happy(n)).count() as u64
}
