use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::models::{Candidate, MatchAnalysis};

/// The session's candidate collection, in insertion order until a match
/// analysis re-sorts it.
#[derive(Default)]
pub struct CandidateStore {
    candidates: Mutex<Vec<Candidate>>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Candidate>> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, candidate: Candidate) {
        self.lock().push(candidate);
    }

    pub fn all(&self) -> Vec<Candidate> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Candidate> {
        self.lock().iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns how many records changed.
    pub fn set_shortlisted(&self, ids: &[String], shortlisted: bool) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut changed = 0;
        for candidate in self.lock().iter_mut() {
            if wanted.contains(candidate.id.as_str()) && candidate.is_shortlisted != shortlisted {
                candidate.is_shortlisted = shortlisted;
                changed += 1;
            }
        }
        changed
    }

    /// Returns how many records were removed.
    pub fn delete(&self, ids: &[String]) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut candidates = self.lock();
        let before = candidates.len();
        candidates.retain(|candidate| !doomed.contains(candidate.id.as_str()));
        before - candidates.len()
    }

    /// Writes match results back by id, then orders the collection by score
    /// descending with unscored records last. Ids no longer present (deleted
    /// while the analysis ran) are ignored.
    pub fn apply_match_results(&self, scored: Vec<Candidate>) -> usize {
        let mut results: HashMap<String, MatchAnalysis> = scored
            .into_iter()
            .filter_map(|c| c.match_analysis.map(|analysis| (c.id, analysis)))
            .collect();

        let mut candidates = self.lock();
        let mut applied = 0;
        for candidate in candidates.iter_mut() {
            if let Some(analysis) = results.remove(&candidate.id) {
                candidate.match_analysis = Some(analysis);
                applied += 1;
            }
        }
        candidates.sort_by(compare_by_score_desc);
        applied
    }

    pub fn clear_match_analysis(&self) -> usize {
        let mut cleared = 0;
        for candidate in self.lock().iter_mut() {
            if candidate.match_analysis.take().is_some() {
                cleared += 1;
            }
        }
        cleared
    }
}

fn compare_by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.match_score(), b.match_score()) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
