//! The operations a learner drives.
//!
//! [`StudyService`] is scoped to one user. Every method that writes runs in a
//! single [`Database::transaction`], so a round, its session and the review
//! rows it produces always change together or not at all.

pub mod selection;
pub mod settlement;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{reviews, rounds, settings, words, Database};
use crate::error::{StudyError, StudyResult};
use crate::learning::activity::MAX_ACTIVITY_DAYS;
use crate::learning::{
    build_activity_grid, derive_status, plan_next_review, rate_memory, ActivityGrid, LadderRules,
    MemoryRating, RatingInput, WordStatus,
};
use crate::models::{
    CreateRoundInput, CreateWordInput, Grade, RecordReviewInput, ReviewState, RoundProgress,
    RoundStatus, RoundWordTarget, SessionResult, SessionType, StudyRound, StudySession,
    StudySettings, UpdateSettingsInput, UpdateWordInput, Word, WordStats, MAX_FREEZE_ROUNDS,
    MAX_ROUND_WORDS, MAX_SESSION_SIZE,
};

use selection::RoundSnapshot;
use settlement::{RoundSettled, SettlementReport};

const MAX_ROUND_NAME_LEN: usize = 200;

/// What `finish_session` did.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionFinish {
    pub round_id: Uuid,
    /// The session had already been finished; nothing was applied.
    pub already_finished: bool,
    pub round_status: RoundStatus,
    /// Present only when this call completed the round.
    pub settlement: Option<SettlementReport>,
}

#[derive(Clone)]
pub struct StudyService {
    db: Database,
    user_id: Uuid,
}

impl StudyService {
    pub fn new(db: Database, user_id: Uuid) -> Self {
        Self { db, user_id }
    }

    // ============================================================
    // Words
    // ============================================================

    pub fn add_word(&self, input: CreateWordInput) -> StudyResult<Word> {
        if input.text.trim().is_empty() {
            return Err(StudyError::validation("word text must not be empty"));
        }
        if input.language.trim().is_empty() {
            return Err(StudyError::validation("word language must not be empty"));
        }
        let word = self
            .db
            .transaction(|conn| words::insert_word(conn, self.user_id, input))?;
        tracing::debug!("Added word {} ({})", word.text, word.id);
        Ok(word)
    }

    pub fn get_word(&self, id: Uuid) -> StudyResult<Word> {
        self.db
            .read(|conn| words::get_word(conn, self.user_id, id))?
            .ok_or(StudyError::NotFound("Word"))
    }

    pub fn list_words(&self) -> StudyResult<Vec<Word>> {
        self.db.read(|conn| words::list_words(conn, self.user_id))
    }

    pub fn update_word(&self, id: Uuid, input: UpdateWordInput) -> StudyResult<Word> {
        self.db
            .transaction(|conn| words::update_word(conn, self.user_id, id, input))?
            .ok_or(StudyError::NotFound("Word"))
    }

    /// Delete a word. Open rounds that held it are re-checked, so a round
    /// whose only unfinished word was this one completes and settles now.
    pub fn delete_word(&self, id: Uuid) -> StudyResult<()> {
        self.db.transaction(|conn| {
            if !words::delete_word(conn, self.user_id, id)? {
                return Err(StudyError::NotFound("Word"));
            }
            let now = Utc::now();
            for mut round in rounds::list_rounds(conn, self.user_id)? {
                if round.status != RoundStatus::Active || !round.contains(id) {
                    continue;
                }
                if self.close_round(conn, &mut round, now)?.is_some() {
                    tracing::info!("Round {} completed after deleting word {}", round.id, id);
                }
                rounds::save_round_progress(conn, &round)?;
            }
            Ok(())
        })?;
        tracing::info!("Deleted word {}", id);
        Ok(())
    }

    // ============================================================
    // Settings
    // ============================================================

    pub fn settings(&self) -> StudyResult<StudySettings> {
        self.db
            .transaction(|conn| settings::get_or_create_settings(conn, self.user_id))
    }

    pub fn update_settings(&self, input: UpdateSettingsInput) -> StudyResult<StudySettings> {
        if let Some(size) = input.session_size {
            if !(1..=MAX_SESSION_SIZE).contains(&size) {
                return Err(StudyError::validation(format!(
                    "session size must be between 1 and {MAX_SESSION_SIZE}"
                )));
            }
        }
        if let Some(freeze) = input.freeze_rounds {
            if !(1..=MAX_FREEZE_ROUNDS).contains(&freeze) {
                return Err(StudyError::validation(format!(
                    "freeze rounds must be between 1 and {MAX_FREEZE_ROUNDS}"
                )));
            }
        }

        self.db.transaction(|conn| {
            let mut current = settings::get_or_create_settings(conn, self.user_id)?;
            if let Some(size) = input.session_size {
                current.session_size = size;
            }
            if let Some(freeze) = input.freeze_rounds {
                current.freeze_rounds = freeze;
            }
            if let Some(auto_play) = input.auto_play_audio {
                current.auto_play_audio = auto_play;
            }
            if let Some(strict) = input.require_consecutive_known {
                current.require_consecutive_known = strict;
            }
            current.updated_at = Utc::now();
            settings::save_settings(conn, &current)?;
            Ok(current)
        })
    }

    // ============================================================
    // Rounds
    // ============================================================

    pub fn create_round(&self, input: CreateRoundInput) -> StudyResult<StudyRound> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(StudyError::validation("round name must not be empty"));
        }
        if name.chars().count() > MAX_ROUND_NAME_LEN {
            return Err(StudyError::validation(format!(
                "round name must be at most {MAX_ROUND_NAME_LEN} characters"
            )));
        }
        if input.word_ids.is_empty() || input.word_ids.len() > MAX_ROUND_WORDS {
            return Err(StudyError::validation(format!(
                "a round needs between 1 and {MAX_ROUND_WORDS} words"
            )));
        }
        let unique: HashSet<&Uuid> = input.word_ids.iter().collect();
        if unique.len() != input.word_ids.len() {
            return Err(StudyError::validation("a round cannot list the same word twice"));
        }

        let round = self.db.transaction(|conn| {
            let owned = words::find_owned_words(conn, self.user_id, &input.word_ids)?;
            if owned.len() != input.word_ids.len() {
                return Err(StudyError::NotFound("Word"));
            }

            let now = Utc::now();
            let round = StudyRound {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                name: name.to_string(),
                word_ids: input.word_ids.clone(),
                completed_word_ids: Vec::new(),
                attempted_word_ids: Vec::new(),
                first_try_known_word_ids: Vec::new(),
                status: RoundStatus::Active,
                created_at: now,
                updated_at: now,
                settled_at: None,
            };
            rounds::insert_round(conn, &round)?;
            Ok(round)
        })?;

        tracing::info!(
            "Created round {} '{}' with {} words",
            round.id,
            round.name,
            round.word_ids.len()
        );
        Ok(round)
    }

    pub fn get_round(&self, id: Uuid) -> StudyResult<StudyRound> {
        self.db.read(|conn| self.load_round(conn, id))
    }

    pub fn list_rounds(&self) -> StudyResult<Vec<StudyRound>> {
        self.db.read(|conn| rounds::list_rounds(conn, self.user_id))
    }

    pub fn archive_round(&self, id: Uuid) -> StudyResult<StudyRound> {
        let round = self.db.transaction(|conn| {
            let mut round = self.load_round(conn, id)?;
            if round.status != RoundStatus::Archived {
                round.status = RoundStatus::Archived;
                round.updated_at = Utc::now();
                rounds::save_round_progress(conn, &round)?;
            }
            Ok(round)
        })?;
        tracing::info!("Archived round {}", id);
        Ok(round)
    }

    pub fn round_progress(&self, id: Uuid) -> StudyResult<RoundProgress> {
        self.db.read(|conn| {
            let round = self.load_round(conn, id)?;
            Ok(self.snapshot(conn, &round)?.progress())
        })
    }

    // ============================================================
    // Sessions
    // ============================================================

    /// Open a batch of words for the round, or hand back the batch that is
    /// already open for this round and type.
    pub fn start_session(&self, round_id: Uuid, session_type: SessionType) -> StudyResult<StudySession> {
        self.db.transaction(|conn| {
            let round = self.load_round(conn, round_id)?;
            if round.status == RoundStatus::Archived {
                return Err(StudyError::conflict("round is archived"));
            }

            if let Some(open) = rounds::find_open_session(conn, round.id, session_type)? {
                tracing::debug!(
                    "Reusing open {} session {} for round {}",
                    session_type.as_str(),
                    open.id,
                    round.id
                );
                return Ok(open);
            }

            let limit = settings::get_or_create_settings(conn, self.user_id)?.session_size as usize;
            let snapshot = self.snapshot(conn, &round)?;
            let word_ids = match session_type {
                SessionType::Normal => snapshot.normal_batch(limit),
                SessionType::Extra => snapshot.extra_batch(limit),
            };
            if word_ids.is_empty() {
                return Err(StudyError::EmptyPool(session_type));
            }

            let session = StudySession {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                round_id: round.id,
                session_type,
                word_ids,
                results: Vec::new(),
                created_at: Utc::now(),
                completed_at: None,
            };
            rounds::insert_session(conn, &session)?;

            tracing::info!(
                "Started {} session {} for round {} with {} words",
                session_type.as_str(),
                session.id,
                round.id,
                session.word_ids.len()
            );
            Ok(session)
        })
    }

    pub fn get_session(&self, id: Uuid) -> StudyResult<StudySession> {
        self.db
            .read(|conn| rounds::get_session(conn, self.user_id, id))?
            .ok_or(StudyError::NotFound("Session"))
    }

    /// Persist partial results for an open session.
    ///
    /// `results` must replay the session order from the start and may only
    /// grow. A completed session accepts nothing and reports what it holds.
    pub fn save_session_progress(&self, session_id: Uuid, results: Vec<SessionResult>) -> StudyResult<usize> {
        self.db.transaction(|conn| {
            let session = rounds::get_session(conn, self.user_id, session_id)?
                .ok_or(StudyError::NotFound("Session"))?;
            if session.is_completed() {
                return Ok(session.results.len());
            }

            if results.len() > session.word_ids.len() {
                tracing::warn!(
                    "Rejected progress for session {}: {} results for {} words",
                    session.id,
                    results.len(),
                    session.word_ids.len()
                );
                return Err(StudyError::conflict("progress is longer than the session"));
            }
            if let Some(index) = results
                .iter()
                .zip(&session.word_ids)
                .position(|(result, expected)| result.word_id != *expected)
            {
                tracing::warn!(
                    "Rejected progress for session {}: result {} is out of order",
                    session.id,
                    index
                );
                return Err(StudyError::conflict(format!(
                    "result {index} does not follow the session order"
                )));
            }
            if results.len() < session.results.len() {
                tracing::warn!(
                    "Rejected progress for session {}: {} results would drop saved ones",
                    session.id,
                    results.len()
                );
                return Err(StudyError::conflict("progress is behind what is already saved"));
            }

            rounds::save_session_results(conn, session.id, &results)?;
            Ok(results.len())
        })
    }

    /// Apply a session's outcomes to its round and seal it.
    ///
    /// Empty `results` means "use what was saved". Finishing a session twice
    /// is not an error; the second call changes nothing.
    pub fn finish_session(&self, session_id: Uuid, results: Vec<SessionResult>) -> StudyResult<SessionFinish> {
        self.db.transaction(|conn| {
            let session = rounds::get_session(conn, self.user_id, session_id)?
                .ok_or(StudyError::NotFound("Session"))?;
            let mut round = self.load_round(conn, session.round_id)?;

            if session.is_completed() {
                tracing::debug!("Session {} was already finished", session.id);
                return Ok(SessionFinish {
                    round_id: round.id,
                    already_finished: true,
                    round_status: round.status,
                    settlement: None,
                });
            }
            if round.status == RoundStatus::Archived {
                return Err(StudyError::conflict("round is archived"));
            }

            let results = if results.is_empty() {
                session.results.clone()
            } else {
                results
            };
            let in_session: HashSet<&Uuid> = session.word_ids.iter().collect();
            if results.iter().any(|r| !in_session.contains(&r.word_id)) {
                return Err(StudyError::validation("result for a word outside the session"));
            }

            let attempted = self.snapshot(conn, &round)?.attempted_set();
            let live: HashSet<Uuid> = words::find_owned_words(conn, self.user_id, &session.word_ids)?
                .into_iter()
                .map(|w| w.id)
                .collect();
            let outcomes: HashMap<Uuid, Grade> =
                results.iter().map(|r| (r.word_id, r.outcome)).collect();

            let now = Utc::now();
            let mut applied = 0;
            for word_id in &session.word_ids {
                let Some(outcome) = outcomes.get(word_id).copied() else {
                    continue;
                };
                if !live.contains(word_id) || !round.contains(*word_id) {
                    tracing::warn!("Skipping outcome for missing word {}", word_id);
                    continue;
                }

                let first_attempt =
                    session.session_type == SessionType::Normal && !attempted.contains(word_id);
                round.mark_attempted(*word_id);
                if outcome == Grade::Known {
                    round.mark_completed(*word_id);
                    if first_attempt {
                        round.mark_first_try_known(*word_id);
                    }
                }

                reviews::append_log(conn, self.user_id, *word_id, outcome, false, now)?;
                reviews::record_encounter(conn, self.user_id, *word_id, outcome, now)?;
                applied += 1;
            }

            let settlement = self.close_round(conn, &mut round, now)?;
            rounds::save_round_progress(conn, &round)?;
            rounds::complete_session(conn, session.id, &results, now)?;

            tracing::info!(
                "Finished session {} for round {}: {} outcomes applied, round {}",
                session.id,
                round.id,
                applied,
                round.status.as_str()
            );
            Ok(SessionFinish {
                round_id: round.id,
                already_finished: false,
                round_status: round.status,
                settlement,
            })
        })
    }

    /// Manually set how a word stands in a round.
    pub fn edit_round_word_status(
        &self,
        round_id: Uuid,
        word_id: Uuid,
        target: RoundWordTarget,
    ) -> StudyResult<StudyRound> {
        self.db.transaction(|conn| {
            let mut round = self.load_round(conn, round_id)?;
            if round.status == RoundStatus::Archived {
                return Err(StudyError::conflict("round is archived"));
            }
            if !round.contains(word_id) || words::get_word(conn, self.user_id, word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }

            round.mark_attempted(word_id);
            let grade = match target {
                RoundWordTarget::FirstTryMastered => {
                    round.mark_completed(word_id);
                    round.mark_first_try_known(word_id);
                    Grade::Known
                }
                RoundWordTarget::Mastered => {
                    round.mark_completed(word_id);
                    round.unmark_first_try_known(word_id);
                    Grade::Known
                }
                RoundWordTarget::Fuzzy => {
                    round.unmark_completed(word_id);
                    Grade::Fuzzy
                }
                RoundWordTarget::Unknown => {
                    round.unmark_completed(word_id);
                    Grade::Unknown
                }
            };

            let now = Utc::now();
            reviews::append_log(conn, self.user_id, word_id, grade, false, now)?;
            reviews::record_encounter(conn, self.user_id, word_id, grade, now)?;

            self.close_round(conn, &mut round, now)?;
            rounds::save_round_progress(conn, &round)?;

            tracing::info!(
                "Set word {} in round {} to {}",
                word_id,
                round.id,
                target.as_str()
            );
            Ok(round)
        })
    }

    // ============================================================
    // Fixed-interval review path
    // ============================================================

    pub fn record_review(&self, input: RecordReviewInput, now: DateTime<Utc>) -> StudyResult<ReviewState> {
        self.db.transaction(|conn| {
            if words::get_word(conn, self.user_id, input.word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }

            let mut state = reviews::get_state(conn, self.user_id, input.word_id)?
                .unwrap_or_else(|| ReviewState::fresh(self.user_id, input.word_id));
            let plan = plan_next_review(state.stage, input.grade, now);

            state.seen_count += 1;
            state.lapse_count += plan.lapse_increment;
            state.stage = plan.next_stage;
            state.due_at = Some(plan.due_at);
            state.last_reviewed_at = Some(now);

            let perfect = input.grade == Grade::Known && !input.revealed_answer;
            state.set_mastery(state.mastery().advance(perfect, &LadderRules::PER_ENCOUNTER));

            reviews::save_state(conn, &state)?;
            reviews::append_log(conn, self.user_id, input.word_id, input.grade, input.revealed_answer, now)?;

            tracing::debug!(
                "Reviewed word {} as {}: stage {}, due {}",
                input.word_id,
                input.grade.as_str(),
                state.stage,
                plan.due_at
            );
            Ok(state)
        })
    }

    /// Words whose fixed-interval due date is at or before `now`, most overdue first.
    pub fn due_words(&self, now: DateTime<Utc>, limit: usize) -> StudyResult<Vec<Word>> {
        self.db.read(|conn| {
            let due = reviews::due_states(conn, self.user_id, now, limit)?;
            let ids: Vec<Uuid> = due.iter().map(|s| s.word_id).collect();
            let mut by_id: HashMap<Uuid, Word> = words::find_owned_words(conn, self.user_id, &ids)?
                .into_iter()
                .map(|w| (w.id, w))
                .collect();
            Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
        })
    }

    // ============================================================
    // Analytics
    // ============================================================

    /// The word's counters, or `None` if it has never been reviewed.
    pub fn review_state(&self, word_id: Uuid) -> StudyResult<Option<ReviewState>> {
        self.db.read(|conn| {
            if words::get_word(conn, self.user_id, word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }
            reviews::get_state(conn, self.user_id, word_id)
        })
    }

    /// Status for word lists. Frozen words report `Frozen`.
    pub fn word_status(&self, word_id: Uuid) -> StudyResult<WordStatus> {
        self.db.read(|conn| {
            if words::get_word(conn, self.user_id, word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }
            let state = reviews::get_state(conn, self.user_id, word_id)?;
            let latest = reviews::latest_grades(conn, self.user_id, &[word_id])?;
            Ok(derive_status(state.as_ref(), latest.get(&word_id).copied()))
        })
    }

    pub fn memory_rating(&self, word_id: Uuid, now: DateTime<Utc>) -> StudyResult<MemoryRating> {
        self.db.read(|conn| {
            if words::get_word(conn, self.user_id, word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }
            let state = reviews::get_state(conn, self.user_id, word_id)?
                .unwrap_or_else(|| ReviewState::fresh(self.user_id, word_id));
            let logs = reviews::logs_for_word(conn, self.user_id, word_id)?;
            Ok(rate_memory(RatingInput {
                stage: state.stage,
                due_at: state.due_at,
                lapse_count: state.lapse_count,
                seen_count: state.seen_count,
                logs: &logs,
                now,
            }))
        })
    }

    pub fn word_stats(&self, word_id: Uuid) -> StudyResult<WordStats> {
        self.db.read(|conn| {
            if words::get_word(conn, self.user_id, word_id)?.is_none() {
                return Err(StudyError::NotFound("Word"));
            }
            let logs = reviews::logs_for_word(conn, self.user_id, word_id)?;
            Ok(WordStats::from_logs(&logs))
        })
    }

    /// Review counts per day for the `days` days ending on `today` (UTC).
    pub fn activity_heatmap(&self, days: u32, today: NaiveDate) -> StudyResult<ActivityGrid> {
        if days > MAX_ACTIVITY_DAYS {
            return Err(StudyError::validation(format!(
                "heatmap covers at most {MAX_ACTIVITY_DAYS} days"
            )));
        }
        let days = days.max(1);
        let since = today
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| StudyError::validation("heatmap starts before the earliest date"))?
            .and_time(NaiveTime::MIN)
            .and_utc();
        let stamps = self
            .db
            .read(|conn| reviews::log_timestamps(conn, self.user_id, since))?;
        Ok(build_activity_grid(&stamps, days, today))
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn load_round(&self, conn: &Connection, id: Uuid) -> StudyResult<StudyRound> {
        rounds::get_round(conn, self.user_id, id)?.ok_or(StudyError::NotFound("Round"))
    }

    fn snapshot<'a>(&self, conn: &Connection, round: &'a StudyRound) -> StudyResult<RoundSnapshot<'a>> {
        let owned = words::find_owned_words(conn, self.user_id, &round.word_ids)?;
        let states = reviews::get_states(conn, self.user_id, &round.word_ids)?;
        let latest = reviews::latest_grades(conn, self.user_id, &round.word_ids)?;
        Ok(RoundSnapshot::new(round, owned, states, latest))
    }

    /// Recompute the round's status and settle it if it just became complete.
    fn close_round(
        &self,
        conn: &Connection,
        round: &mut StudyRound,
        now: DateTime<Utc>,
    ) -> StudyResult<Option<SettlementReport>> {
        let live: HashSet<Uuid> = words::find_owned_words(conn, self.user_id, &round.word_ids)?
            .into_iter()
            .map(|w| w.id)
            .collect();
        let removed: HashSet<Uuid> = round
            .word_ids
            .iter()
            .filter(|id| !live.contains(*id))
            .copied()
            .collect();
        round.refresh_status(&removed);
        round.updated_at = now;
        if round.status != RoundStatus::Completed || round.settled_at.is_some() {
            return Ok(None);
        }

        let current = settings::get_or_create_settings(conn, self.user_id)?;
        let event = RoundSettled::from_round(round, now);
        let report = settlement::apply(conn, &event, &LadderRules::for_rounds(&current))?;
        round.settled_at = Some(now);
        Ok(Some(report))
    }
}
