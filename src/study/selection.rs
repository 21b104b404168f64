//! Choosing the next batch of words from a round.
//!
//! Selection is a pure function of a [`RoundSnapshot`]: the round plus the
//! words, states and latest grades loaded for it. The service loads the
//! snapshot inside the same transaction that creates the session.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::learning::{derive_round_status, WordStatus};
use crate::models::{Grade, ReviewState, RoundProgress, StudyRound, Word};

pub struct RoundSnapshot<'a> {
    pub round: &'a StudyRound,
    pub words: HashMap<Uuid, Word>,
    pub states: HashMap<Uuid, ReviewState>,
    pub latest_grades: HashMap<Uuid, Grade>,
}

impl<'a> RoundSnapshot<'a> {
    pub fn new(
        round: &'a StudyRound,
        words: Vec<Word>,
        states: HashMap<Uuid, ReviewState>,
        latest_grades: HashMap<Uuid, Grade>,
    ) -> Self {
        Self {
            round,
            words: words.into_iter().map(|w| (w.id, w)).collect(),
            states,
            latest_grades,
        }
    }

    /// In-round status of a word.
    pub fn status(&self, word_id: Uuid) -> WordStatus {
        derive_round_status(
            self.states.get(&word_id),
            self.latest_grades.get(&word_id).copied(),
        )
    }

    /// Attempted words that are still in the round and have actually been seen.
    pub fn attempted_set(&self) -> HashSet<Uuid> {
        self.round
            .attempted_word_ids
            .iter()
            .copied()
            .filter(|id| self.round.contains(*id))
            .filter(|id| self.status(*id) != WordStatus::New)
            .collect()
    }

    /// Round words that still exist, in round order.
    fn live_words(&self) -> impl Iterator<Item = &Word> {
        self.round
            .word_ids
            .iter()
            .filter_map(|id| self.words.get(id))
    }

    /// Words for a normal session: not completed and not yet encountered.
    /// Priority words first, then oldest first.
    pub fn normal_batch(&self, limit: usize) -> Vec<Uuid> {
        let attempted = self.attempted_set();
        let completed: HashSet<&Uuid> = self.round.completed_word_ids.iter().collect();

        let mut pool: Vec<&Word> = self
            .live_words()
            .filter(|w| !completed.contains(&w.id) && !attempted.contains(&w.id))
            .collect();
        pool.sort_by_key(|w| (!w.is_priority, w.created_at));

        pool.into_iter().take(limit).map(|w| w.id).collect()
    }

    /// Words for an extra session: encountered, not completed, and still
    /// unknown or fuzzy. Unknown before fuzzy, then most recently reviewed
    /// first, then priority, then oldest first.
    pub fn extra_batch(&self, limit: usize) -> Vec<Uuid> {
        let attempted = self.attempted_set();
        let completed: HashSet<&Uuid> = self.round.completed_word_ids.iter().collect();

        let mut pool: Vec<(&Word, WordStatus)> = self
            .live_words()
            .filter(|w| attempted.contains(&w.id) && !completed.contains(&w.id))
            .map(|w| (w, self.status(w.id)))
            .filter(|(_, status)| status.needs_practice())
            .collect();
        pool.sort_by_key(|(w, status)| {
            (
                *status != WordStatus::Unknown,
                Reverse(self.states.get(&w.id).and_then(|s| s.last_reviewed_at)),
                !w.is_priority,
                w.created_at,
            )
        });

        pool.into_iter().take(limit).map(|(w, _)| w.id).collect()
    }

    pub fn progress(&self) -> RoundProgress {
        let mut progress = RoundProgress {
            total: self.round.word_ids.len(),
            completed: self.round.completed_word_ids.len(),
            attempted: self.attempted_set().len(),
            first_try_known: self.round.first_try_known_word_ids.len(),
            ..RoundProgress::default()
        };
        for id in &self.round.word_ids {
            match self.status(*id) {
                WordStatus::New => progress.new += 1,
                WordStatus::Seen => progress.seen += 1,
                WordStatus::Fuzzy => progress.fuzzy += 1,
                WordStatus::Unknown => progress.unknown += 1,
                WordStatus::Mastered => progress.mastered += 1,
                WordStatus::Frozen => {}
            }
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::RoundStatus;

    struct Fixture {
        words: Vec<Word>,
        round: StudyRound,
        states: HashMap<Uuid, ReviewState>,
        grades: HashMap<Uuid, Grade>,
    }

    impl Fixture {
        fn new(n: usize) -> Self {
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let user = Uuid::new_v4();
            let words: Vec<Word> = (0..n)
                .map(|i| Word {
                    id: Uuid::new_v4(),
                    user_id: user,
                    text: format!("w{i}"),
                    language: "en".to_string(),
                    note: None,
                    is_priority: false,
                    category: None,
                    created_at: base + Duration::minutes(i as i64),
                })
                .collect();
            let round = StudyRound {
                id: Uuid::new_v4(),
                user_id: user,
                name: "r".to_string(),
                word_ids: words.iter().map(|w| w.id).collect(),
                completed_word_ids: Vec::new(),
                attempted_word_ids: Vec::new(),
                first_try_known_word_ids: Vec::new(),
                status: RoundStatus::Active,
                created_at: base,
                updated_at: base,
                settled_at: None,
            };
            Self {
                words,
                round,
                states: HashMap::new(),
                grades: HashMap::new(),
            }
        }

        fn id(&self, i: usize) -> Uuid {
            self.words[i].id
        }

        fn review(&mut self, i: usize, grade: Grade, minutes_ago: i64) {
            let id = self.id(i);
            let at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago);
            let state = self
                .states
                .entry(id)
                .or_insert_with(|| ReviewState::fresh(self.round.user_id, id));
            state.seen_count += 1;
            state.last_reviewed_at = Some(at);
            self.grades.insert(id, grade);
            self.round.mark_attempted(id);
            if grade == Grade::Known {
                self.round.mark_completed(id);
            }
        }

        fn snapshot(&self) -> RoundSnapshot<'_> {
            RoundSnapshot::new(
                &self.round,
                self.words.clone(),
                self.states.clone(),
                self.grades.clone(),
            )
        }
    }

    #[test]
    fn normal_batch_takes_unattempted_words_in_creation_order() {
        let mut f = Fixture::new(3);
        assert_eq!(f.snapshot().normal_batch(2), vec![f.id(0), f.id(1)]);

        f.review(0, Grade::Known, 5);
        f.review(1, Grade::Unknown, 5);
        assert_eq!(f.snapshot().normal_batch(2), vec![f.id(2)]);
        assert_eq!(f.snapshot().extra_batch(2), vec![f.id(1)]);
    }

    #[test]
    fn priority_words_come_first() {
        let mut f = Fixture::new(3);
        f.words[2].is_priority = true;
        assert_eq!(f.snapshot().normal_batch(3), vec![f.id(2), f.id(0), f.id(1)]);
    }

    #[test]
    fn extra_orders_unknown_then_most_recent() {
        let mut f = Fixture::new(4);
        f.review(0, Grade::Fuzzy, 1);
        f.review(1, Grade::Unknown, 30);
        f.review(2, Grade::Unknown, 2);
        f.review(3, Grade::Known, 0);
        assert_eq!(
            f.snapshot().extra_batch(10),
            vec![f.id(2), f.id(1), f.id(0)]
        );
    }

    #[test]
    fn attempted_but_unseen_words_count_as_unattempted() {
        let mut f = Fixture::new(2);
        let id = f.id(0);
        f.round.mark_attempted(id);
        assert!(f.snapshot().attempted_set().is_empty());
        assert_eq!(f.snapshot().normal_batch(5), vec![f.id(0), f.id(1)]);
    }

    #[test]
    fn deleted_words_are_skipped() {
        let mut f = Fixture::new(2);
        f.words.remove(0);
        assert_eq!(f.snapshot().normal_batch(5), vec![f.round.word_ids[1]]);
    }

    #[test]
    fn progress_counts_in_round_statuses() {
        let mut f = Fixture::new(4);
        f.review(0, Grade::Known, 1);
        f.review(1, Grade::Fuzzy, 1);
        f.review(2, Grade::Unknown, 1);
        let p = f.snapshot().progress();
        assert_eq!(
            (p.total, p.completed, p.attempted, p.new, p.seen, p.fuzzy, p.unknown),
            (4, 1, 3, 1, 1, 1, 1)
        );
    }
}
