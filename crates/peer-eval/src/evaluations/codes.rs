use std::collections::{BTreeMap, HashSet};

use rand::Rng;

use super::domain::EmployeeId;
use super::repository::RepositoryError;

pub const CODE_LENGTH: usize = 16;
pub const MAX_CODE_ATTEMPTS: usize = 1024;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Codes handed out during one generation run, one per evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBook {
    codes: BTreeMap<EmployeeId, String>,
}

impl CodeBook {
    pub fn get(&self, evaluator: EmployeeId) -> Option<&str> {
        self.codes.get(&evaluator).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmployeeId, &str)> {
        self.codes.iter().map(|(id, code)| (*id, code.as_str()))
    }
}

pub fn random_code<G: Rng>(rng: &mut G) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|byte| CODE_ALPHABET.contains(&byte))
}

/// Draws `[A-Z0-9]{16}` codes that collide with neither `taken` nor earlier draws.
pub struct EvaluationCodeIssuer<G> {
    rng: G,
    taken: HashSet<String>,
}

impl<G: Rng> EvaluationCodeIssuer<G> {
    pub fn new(rng: G, taken: HashSet<String>) -> Self {
        Self { rng, taken }
    }

    /// Memoized per evaluator through `book`.
    pub fn code_for(
        &mut self,
        book: &mut CodeBook,
        evaluator: EmployeeId,
    ) -> Result<String, RepositoryError> {
        if let Some(code) = book.codes.get(&evaluator) {
            return Ok(code.clone());
        }
        let code = self.issue()?;
        book.codes.insert(evaluator, code.clone());
        Ok(code)
    }

    pub fn issue(&mut self) -> Result<String, RepositoryError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = random_code(&mut self.rng);
            if self.taken.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(RepositoryError::Conflict(format!(
            "no unused evaluation code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }
}
