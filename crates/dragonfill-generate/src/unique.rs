use std::collections::HashSet;

use crate::errors::GenerationError;

/// Rejection sampler that never hands out the same value twice.
///
/// Each draw gets a bounded number of attempts; the attempt number is passed
/// to the candidate builder so later attempts can widen the value space.
#[derive(Debug, Clone)]
pub struct UniqueSampler {
    label: &'static str,
    used: HashSet<String>,
    max_attempts: u32,
}

impl UniqueSampler {
    pub fn new(label: &'static str, max_attempts: u32) -> Self {
        Self {
            label,
            used: HashSet::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn draw<F>(&mut self, mut candidate: F) -> Result<String, GenerationError>
    where
        F: FnMut(u32) -> String,
    {
        for attempt in 0..self.max_attempts {
            let value = candidate(attempt);
            if self.used.insert(value.clone()) {
                return Ok(value);
            }
        }
        Err(GenerationError::Invariant(format!(
            "could not draw a unique {} after {} attempts ({} in use)",
            self.label,
            self.max_attempts,
            self.used.len()
        )))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.used.contains(value)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_a_fresh_value_appears() {
        let mut sampler = UniqueSampler::new("code", 10);
        assert_eq!(sampler.draw(|_| "a".to_string()).expect("first"), "a");

        let drawn = sampler
            .draw(|attempt| if attempt < 3 { "a".into() } else { "b".into() })
            .expect("second");
        assert_eq!(drawn, "b");
        assert!(sampler.contains("b"));
        assert_eq!(sampler.len(), 2);
    }

    #[test]
    fn exhausted_space_fails_loudly() {
        let mut sampler = UniqueSampler::new("phone", 5);
        sampler.draw(|_| "1".to_string()).expect("first");
        let err = sampler.draw(|_| "1".to_string()).expect_err("exhausted");
        assert!(err.to_string().contains("unique phone"));
    }
}
