use serde::{Deserialize, Serialize};

use crate::canonical::{count_happy_numbers, is_prime, MAX_RANGE_WIDTH};
use crate::{DriftError, Evaluator, Result};

/// Construction parameters. Prompt, description, id and evaluator are all
/// derived from these, so equal parameters always give the same benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchmarkKind {
    Prime { n: u64, is_prime: bool },
    CountingHappyNumbers { start: u64, end: u64, count: u64 },
}

impl BenchmarkKind {
    pub fn label(&self) -> &'static str {
        match self {
            BenchmarkKind::Prime { .. } => "Prime",
            BenchmarkKind::CountingHappyNumbers { .. } => "Counting happy numbers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    kind: BenchmarkKind,
    id: String,
    prompt: String,
    description: String,
    evaluator: Evaluator,
}

impl Benchmark {
    /// Rejects parameters that disagree with the ground truth.
    pub fn new(kind: BenchmarkKind) -> Result<Self> {
        validate(&kind)?;
        Ok(Self::build(kind))
    }

    fn build(kind: BenchmarkKind) -> Self {
        let (id, prompt, description, evaluator) = match &kind {
            BenchmarkKind::Prime { n, is_prime } => {
                let suffix = if *is_prime { "IsPrime" } else { "IsNotPrime" };
                let verdict = if *is_prime { "is prime" } else { "is not prime" };
                (
                    format!("PrimeBenchmark{}{}", n, suffix),
                    format!(
                        r#"Is {} a prime number? Think step by step and then answer "[Yes]" or "[No]"."#,
                        n
                    ),
                    format!("Evaluates the LLM to check that {} {}.", n, verdict),
                    Evaluator::yes_no(*is_prime),
                )
            }
            BenchmarkKind::CountingHappyNumbers { start, end, count } => (
                format!("CountingHappyNumbersBenchmark{}To{}", start, end),
                format!(
                    "How many happy numbers are there between {} and {} inclusive? \
                     Think step by step and then give the final count as \\boxed{{<number>}}.",
                    start, end
                ),
                format!(
                    "Evaluates the LLM to count the {} happy numbers between {} and {}.",
                    count, start, end
                ),
                Evaluator::boxed_integer(*count as i64),
            ),
        };

        Self {
            kind,
            id,
            prompt,
            description,
            evaluator,
        }
    }

    pub fn prime(n: u64, is_prime: bool) -> Result<Self> {
        Self::new(BenchmarkKind::Prime { n, is_prime })
    }

    pub fn counting_happy_numbers(start: u64, end: u64, count: u64) -> Result<Self> {
        Self::new(BenchmarkKind::CountingHappyNumbers { start, end, count })
    }

    /// Counting benchmark whose expected count is computed here.
    pub fn counting_happy_numbers_in(start: u64, end: u64) -> Result<Self> {
        check_range(start, end)?;
        let count = count_happy_numbers(start, end);
        Ok(Self::build(BenchmarkKind::CountingHappyNumbers { start, end, count }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &BenchmarkKind {
        &self.kind
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn evaluate(&self, prompt: &str, response: &str) -> u32 {
        self.evaluator.evaluate(prompt, response)
    }
}

fn validate(kind: &BenchmarkKind) -> Result<()> {
    match *kind {
        BenchmarkKind::Prime { n, is_prime: flag } => {
            if is_prime(n) != flag {
                return Err(DriftError::InvalidBenchmark(format!(
                    "{} is {}prime but was declared otherwise",
                    n,
                    if flag { "not " } else { "" }
                )));
            }
        }
        BenchmarkKind::CountingHappyNumbers { start, end, count } => {
            check_range(start, end)?;
            if count > i64::MAX as u64 {
                return Err(DriftError::InvalidBenchmark(format!("count {} too large", count)));
            }
            let actual = count_happy_numbers(start, end);
            if actual != count {
                return Err(DriftError::InvalidBenchmark(format!(
                    "[{}, {}] contains {} happy numbers, not {}",
                    start, end, actual, count
                )));
            }
        }
    }
    Ok(())
}

/// Bounds the counting work done at construction.
fn check_range(start: u64, end: u64) -> Result<()> {
    if start > end {
        return Err(DriftError::InvalidBenchmark(format!(
            "empty range [{}, {}]",
            start, end
        )));
    }
    if end - start >= MAX_RANGE_WIDTH {
        return Err(DriftError::InvalidBenchmark(format!(
            "range [{}, {}] is wider than {} numbers",
            start, end, MAX_RANGE_WIDTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_texts() {
        let b = Benchmark::prime(11, true).unwrap();
        assert_eq!(
            b.prompt(),
            r#"Is 11 a prime number? Think step by step and then answer "[Yes]" or "[No]"."#
        );
        assert_eq!(b.description(), "Evaluates the LLM to check that 11 is prime.");
        assert_eq!(b.id(), "PrimeBenchmark11IsPrime");

        let b = Benchmark::prime(12, false).unwrap();
        assert_eq!(b.id(), "PrimeBenchmark12IsNotPrime");
        assert_eq!(b.description(), "Evaluates the LLM to check that 12 is not prime.");
    }

    #[test]
    fn test_prime_scores() {
        let b = Benchmark::prime(11, true).unwrap();
        assert_eq!(b.evaluate("", "[Yes]"), 100);
        assert_eq!(b.evaluate("", "[No]"), 0);
        assert_eq!(b.evaluate("", "[Yes] [No]"), 0);
        assert_eq!(b.evaluate("", ""), 0);
        assert_eq!(b.evaluate("", "[gibberish][]"), 0);
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = Benchmark::counting_happy_numbers(1, 10, 3).unwrap();
        let b = Benchmark::counting_happy_numbers(1, 10, 3).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
        assert_ne!(a.id(), Benchmark::counting_happy_numbers(1, 13, 4).unwrap().id());
    }

    #[test]
    fn test_inconsistent_prime_rejected() {
        assert!(matches!(
            Benchmark::prime(12, true),
            Err(DriftError::InvalidBenchmark(_))
        ));
        assert!(Benchmark::prime(13, false).is_err());
        assert!(Benchmark::prime(1, false).is_ok());
    }

    #[test]
    fn test_counting_happy_numbers() {
        // 1, 7 and 10 are the happy numbers up to 10
        let b = Benchmark::counting_happy_numbers(1, 10, 3).unwrap();
        assert_eq!(b.id(), "CountingHappyNumbersBenchmark1To10");
        assert!(b.prompt().contains(r"\boxed{<number>}"));
        assert_eq!(b.evaluate("", r"The answer is \boxed{3}."), 100);
        assert_eq!(b.evaluate("", r"\boxed{4}"), 0);

        assert!(Benchmark::counting_happy_numbers(1, 10, 4).is_err());
        assert!(Benchmark::counting_happy_numbers(10, 1, 0).is_err());
    }

    #[test]
    fn test_counting_range_width_is_bounded() {
        assert!(matches!(
            Benchmark::counting_happy_numbers(1, u64::MAX, 0),
            Err(DriftError::InvalidBenchmark(_))
        ));
        assert!(matches!(
            Benchmark::counting_happy_numbers_in(0, u64::MAX),
            Err(DriftError::InvalidBenchmark(_))
        ));
        assert!(Benchmark::counting_happy_numbers_in(1, MAX_RANGE_WIDTH + 1).is_err());

        let widest = Benchmark::counting_happy_numbers_in(1, MAX_RANGE_WIDTH).unwrap();
        let count = count_happy_numbers(1, MAX_RANGE_WIDTH);
        assert_eq!(
            widest,
            Benchmark::counting_happy_numbers(1, MAX_RANGE_WIDTH, count).unwrap()
        );
    }
}
