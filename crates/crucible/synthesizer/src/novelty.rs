use crate::error::{SynthesisError, SynthesisResult};
use crucible_types::text;
use std::sync::Mutex;

const TEMPLATES: &[&str] = &[
    "What breaks if {a} is removed while {b} stays unchanged?",
    "Which hidden assumption links {a} to {b}?",
    "Who would notice first if {a} silently degraded {b}?",
    "Why trust {a} to bound {b} at all?",
    "When does fixing {a} make {b} strictly worse?",
    "Could {b} be the cause rather than a symptom of {a}?",
    "How much {a} budget remains before {b} collapses?",
    "Where does ownership of {a} end and {b} begin?",
];

const FALLBACK_TERMS: &[&str] = &["baseline", "rollout"];

/// Every question the provocateur has asked, across streams.
///
/// Searching and recording happen under one lock so two streams can never
/// claim the same question.
#[derive(Debug, Default)]
pub struct QuestionHistory {
    questions: Mutex<Vec<String>>,
}

/// A question that cleared the novelty bar.
#[derive(Clone, Debug, PartialEq)]
pub struct Claimed {
    pub question: String,
    /// `1 - max similarity to history`.
    pub novelty: f64,
    pub candidates_tried: u32,
}

impl QuestionHistory {
    pub fn new(questions: Vec<String>) -> Self {
        Self {
            questions: Mutex::new(questions),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> SynthesisResult<Vec<String>> {
        Ok(self
            .questions
            .lock()
            .map_err(|_| SynthesisError::LockPoisoned)?
            .clone())
    }

    /// Find the first candidate with similarity `< threshold` to every prior
    /// question and record it.
    pub fn claim(
        &self,
        subject: &str,
        threshold: f64,
        max_attempts: u32,
    ) -> SynthesisResult<Claimed> {
        let mut questions = self
            .questions
            .lock()
            .map_err(|_| SynthesisError::LockPoisoned)?;
        let found = search(subject, &questions, threshold, max_attempts)?;
        questions.push(found.question.clone());
        Ok(found)
    }

    /// Same search without recording.
    pub fn preview(
        &self,
        subject: &str,
        threshold: f64,
        max_attempts: u32,
    ) -> SynthesisResult<Claimed> {
        let questions = self
            .questions
            .lock()
            .map_err(|_| SynthesisError::LockPoisoned)?;
        search(subject, &questions, threshold, max_attempts)
    }
}

/// Candidate questions for a subject: templates crossed with ordered pairs of
/// its focus terms.
pub fn candidates(subject: &str) -> impl Iterator<Item = String> {
    let mut terms = text::focus_terms(subject, 6);
    for fallback in FALLBACK_TERMS {
        if terms.len() >= 2 {
            break;
        }
        if !terms.iter().any(|t| t == fallback) {
            terms.push((*fallback).to_string());
        }
    }
    let mut pairs = Vec::new();
    for (i, a) in terms.iter().enumerate() {
        for (j, b) in terms.iter().enumerate() {
            if i != j {
                pairs.push((a.clone(), b.clone()));
            }
        }
    }
    pairs.into_iter().flat_map(|(a, b)| {
        TEMPLATES
            .iter()
            .map(move |t| t.replace("{a}", &a).replace("{b}", &b))
    })
}

fn search(
    subject: &str,
    history: &[String],
    threshold: f64,
    max_attempts: u32,
) -> SynthesisResult<Claimed> {
    let mut best = 1.0f64;
    let mut tried = 0u32;
    for candidate in candidates(subject).take(max_attempts as usize) {
        tried += 1;
        let similarity = text::max_similarity(&candidate, history.iter().map(String::as_str));
        if similarity < threshold {
            return Ok(Claimed {
                question: candidate,
                novelty: 1.0 - similarity,
                candidates_tried: tried,
            });
        }
        best = best.min(similarity);
    }
    Err(SynthesisError::NoveltyViolation {
        attempts: tried,
        best_similarity: best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_question_is_fully_novel() {
        let history = QuestionHistory::default();
        let claimed = history.claim("latency spike in checkout", 0.6, 24).unwrap();
        assert_eq!(claimed.novelty, 1.0);
        assert_eq!(claimed.candidates_tried, 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn claimed_questions_stay_below_threshold() {
        let history = QuestionHistory::default();
        let mut asked: Vec<String> = Vec::new();
        for _ in 0..6 {
            let c = history.claim("latency spike in checkout", 0.6, 24).unwrap();
            let sim = text::max_similarity(&c.question, asked.iter().map(String::as_str));
            assert!(sim < 0.6, "{} too close ({sim})", c.question);
            asked.push(c.question);
        }
    }

    #[test]
    fn exhaustion_raises_novelty_violation() {
        let history = QuestionHistory::default();
        let mut violation = None;
        for _ in 0..64 {
            match history.claim("latency", 0.6, 4) {
                Ok(_) => continue,
                Err(e) => {
                    violation = Some(e);
                    break;
                }
            }
        }
        let err = violation.expect("history must exhaust");
        assert!(matches!(err, SynthesisError::NoveltyViolation { attempts: 4, .. }));
    }

    #[test]
    fn preview_does_not_record() {
        let history = QuestionHistory::default();
        history.preview("disk pressure", 0.6, 24).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn sparse_subject_uses_fallback_terms() {
        let first = candidates("cpu").next().unwrap();
        assert!(first.contains("baseline"));
    }
}
