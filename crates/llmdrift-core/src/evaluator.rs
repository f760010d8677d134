//! Scoring rules. Every evaluator is a pure scan of the response text;
//! anything it cannot extract scores zero.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: u32 = 100;

pub const YES_TAG: &str = "[Yes]";
pub const NO_TAG: &str = "[No]";

static BOXED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\boxed\{(-?[0-9]+)\}").expect("boxed integer pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluator {
    /// Response must carry exactly one of two disjoint tags.
    ExactTag {
        accept: String,
        reject: String,
        expected: bool,
    },
    /// Response must contain `\boxed{<int>}` equal to `expected`.
    BoxedInteger { expected: i64 },
}

impl Evaluator {
    pub fn yes_no(expected: bool) -> Self {
        Evaluator::ExactTag {
            accept: YES_TAG.to_string(),
            reject: NO_TAG.to_string(),
            expected,
        }
    }

    pub fn boxed_integer(expected: i64) -> Self {
        Evaluator::BoxedInteger { expected }
    }

    pub fn evaluate(&self, _prompt: &str, response: &str) -> u32 {
        match self {
            Evaluator::ExactTag {
                accept,
                reject,
                expected,
            } => match extract_tag(response, accept, reject) {
                Some(answer) if answer == *expected => MAX_SCORE,
                _ => 0,
            },
            Evaluator::BoxedInteger { expected } => match extract_boxed_integer(response) {
                Some(value) if value == *expected => MAX_SCORE,
                _ => 0,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Evaluator::ExactTag { .. } => "exact-tag",
            Evaluator::BoxedInteger { .. } => "boxed-integer",
        }
    }
}

/// `Some(true)` for the accept tag alone, `Some(false)` for the reject tag
/// alone, `None` when both or neither appear.
pub fn extract_tag(response: &str, accept: &str, reject: &str) -> Option<bool> {
    match (response.contains(accept), response.contains(reject)) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// First `\boxed{<int>}` in the response that holds an ASCII integer fitting
/// in an `i64`. Occurrences that overflow are skipped like any other
/// malformed wrapper.
pub fn extract_boxed_integer(response: &str) -> Option<i64> {
    BOXED_INTEGER
        .captures_iter(response)
        .find_map(|caps| caps.get(1)?.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_tag_cases() {
        let eval = Evaluator::yes_no(true);
        assert_eq!(eval.evaluate("", "[Yes]"), 100);
        assert_eq!(eval.evaluate("", "[No]"), 0);
        assert_eq!(eval.evaluate("", "[Yes] [No]"), 0);
        assert_eq!(eval.evaluate("", ""), 0);
        assert_eq!(eval.evaluate("", "[gibberish][]"), 0);
    }

    #[test]
    fn test_exact_tag_expected_false() {
        let eval = Evaluator::yes_no(false);
        assert_eq!(eval.evaluate("", "12 = 2 * 6, so [No]"), 100);
        assert_eq!(eval.evaluate("", "[Yes]"), 0);
        assert_eq!(eval.evaluate("", "[No][Yes]"), 0);
    }

    #[test]
    fn test_exact_tag_is_case_sensitive() {
        let eval = Evaluator::yes_no(true);
        assert_eq!(eval.evaluate("", "[yes]"), 0);
        assert_eq!(eval.evaluate("", "[YES]"), 0);
    }

    #[test]
    fn test_boxed_integer_cases() {
        let eval = Evaluator::boxed_integer(2);
        assert_eq!(eval.evaluate("", r"\boxed{2}"), 100);
        assert_eq!(eval.evaluate("", r"dwajsi\boxed{2}fjsdkljfkdslj2 h u21j "), 100);
        assert_eq!(eval.evaluate("", r"\boxed{23}"), 0);
        assert_eq!(eval.evaluate("", ""), 0);
        assert_eq!(eval.evaluate("", r"[gibberish]\box\boxed{[]"), 0);
    }

    #[test]
    fn test_boxed_integer_first_well_formed_wins() {
        let eval = Evaluator::boxed_integer(7);
        assert_eq!(eval.evaluate("", r"\boxed{seven} then \boxed{7}"), 100);
        assert_eq!(eval.evaluate("", r"\boxed{7} or maybe \boxed{8}"), 100);
        assert_eq!(eval.evaluate("", r"\boxed{8} or maybe \boxed{7}"), 0);

        // Non-ASCII digits are not an integer answer.
        let eval = Evaluator::boxed_integer(2);
        assert_eq!(eval.evaluate("", "\\boxed{\u{FF12}} final \\boxed{2}"), 100);
        assert_eq!(extract_boxed_integer("\\boxed{\u{0662}}"), None);
    }

    #[test]
    fn test_boxed_integer_negative_and_overflow() {
        assert_eq!(Evaluator::boxed_integer(-3).evaluate("", r"\boxed{-3}"), 100);
        assert_eq!(extract_boxed_integer(r"\boxed{99999999999999999999999}"), None);
        assert_eq!(
            extract_boxed_integer(r"\boxed{99999999999999999999999} \boxed{7}"),
            Some(7)
        );
        assert_eq!(extract_boxed_integer(r"\boxed{ 4 }"), None);
    }

    #[test]
    fn test_evaluator_serde_tagging() {
        let json = serde_json::to_value(Evaluator::boxed_integer(5)).unwrap();
        assert_eq!(json["kind"], "boxed_integer");
        assert_eq!(json["expected"], 5);
    }
}
