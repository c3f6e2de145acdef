//! Outcome of a checksum pass and its human-readable rendering.

use serde::Serialize;

use super::DigestAlgorithm;

/// Algorithms that matched and algorithms that did not.
///
/// An algorithm that was not requested appears in neither list, and no
/// algorithm appears more than once across both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    valid: Vec<DigestAlgorithm>,
    invalid: Vec<DigestAlgorithm>,
}

impl VerificationResult {
    /// Record the comparison outcome for one algorithm. Repeated calls for an
    /// algorithm already recorded are ignored.
    pub(crate) fn record(&mut self, algorithm: DigestAlgorithm, matches: bool) {
        if self.valid.contains(&algorithm) || self.invalid.contains(&algorithm) {
            return;
        }
        if matches {
            self.valid.push(algorithm);
        } else {
            self.invalid.push(algorithm);
        }
    }

    pub fn valid(&self) -> &[DigestAlgorithm] {
        &self.valid
    }

    pub fn invalid(&self) -> &[DigestAlgorithm] {
        &self.invalid
    }

    /// At least one algorithm matched and none failed.
    pub fn is_valid(&self) -> bool {
        !self.valid.is_empty() && self.invalid.is_empty()
    }

    /// At least one algorithm failed, regardless of any that matched.
    pub fn is_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }

    /// Nothing was requested, so nothing is claimed about the file.
    pub fn is_no_op(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }

    /// Render the result as a sentence suitable for the terminal.
    pub fn to_message(&self) -> String {
        if self.is_no_op() {
            return "The file's contents were not validated using checksums".to_string();
        }
        if self.is_valid() {
            return format!(
                "The file's contents succeeded validation using {}",
                english_join(&self.valid)
            );
        }
        let failed = format!(
            "The file's contents failed validation using {}",
            english_join(&self.invalid)
        );
        if self.valid.is_empty() {
            failed
        } else {
            format!(
                "{}, it did succeed validation using {}",
                failed,
                english_join(&self.valid)
            )
        }
    }
}

/// "A", "A and B", "A, B and C".
fn english_join(algorithms: &[DigestAlgorithm]) -> String {
    let names: Vec<&str> = algorithms.iter().map(|a| a.name()).collect();
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}
