use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;
use wordladder::learning::scheduler::MAX_STAGE;
use wordladder::learning::{
    plan_next_review, rate_memory, LadderPhase, LadderRules, MasteryState, MemoryLevel, RatingInput,
};
use wordladder::models::{Grade, ReviewLog};

fn rules() -> impl Strategy<Value = LadderRules> {
    (1u32..4, 1u32..10, 1u32..20).prop_map(|(required_streak, first_freeze, second_freeze)| {
        LadderRules {
            required_streak,
            first_freeze,
            second_freeze,
        }
    })
}

fn grade() -> impl Strategy<Value = Grade> {
    prop_oneof![Just(Grade::Unknown), Just(Grade::Fuzzy), Just(Grade::Known)]
}

/// Play outcomes through the ladder, thawing between encounters the way
/// settled rounds would.
fn play(rules: &LadderRules, outcomes: &[bool]) -> MasteryState {
    outcomes.iter().fold(MasteryState::default(), |state, perfect| {
        let mut state = state;
        while state.is_frozen() {
            state = state.thaw();
        }
        state.advance(*perfect, rules)
    })
}

proptest! {
    #[test]
    fn stored_columns_round_trip(rules in rules(), outcomes in prop::collection::vec(any::<bool>(), 0..40)) {
        let state = play(&rules, &outcomes);
        prop_assert_eq!(MasteryState::from_columns(state.columns()), state);
    }

    #[test]
    fn mastered_flag_matches_phase(rules in rules(), outcomes in prop::collection::vec(any::<bool>(), 0..40)) {
        let columns = play(&rules, &outcomes).columns();
        prop_assert!(columns.mastery_phase <= 3);
        prop_assert_eq!(columns.is_mastered, columns.mastery_phase == 3);
        if columns.mastery_phase == 0 || columns.is_mastered {
            prop_assert_eq!(columns.freeze_rounds, 0);
        }
    }

    #[test]
    fn mastered_is_absorbing(rules in rules(), outcomes in prop::collection::vec(any::<bool>(), 0..20)) {
        let end = outcomes
            .iter()
            .fold(MasteryState::Mastered, |s, perfect| s.advance(*perfect, &rules).thaw());
        prop_assert_eq!(end, MasteryState::Mastered);
    }

    #[test]
    fn frozen_words_ignore_outcomes(rules in rules(), rounds_left in 1u32..10, perfect in any::<bool>()) {
        let frozen = MasteryState::Cooldown { phase: LadderPhase::LongFreeze, rounds_left };
        prop_assert_eq!(frozen.advance(perfect, &rules), frozen);
    }

    #[test]
    fn a_miss_always_restarts_an_unfrozen_word(rules in rules(), outcomes in prop::collection::vec(any::<bool>(), 0..40)) {
        let mut state = play(&rules, &outcomes);
        while state.is_frozen() {
            state = state.thaw();
        }
        prop_assume!(!state.is_mastered());
        prop_assert_eq!(state.advance(false, &rules), MasteryState::Building { streak: 0 });
    }

    #[test]
    fn mastery_takes_the_whole_ladder(rules in rules()) {
        let needed = (rules.required_streak + 2) as usize;
        let short = play(&rules, &vec![true; needed - 1]);
        let full = play(&rules, &vec![true; needed]);
        prop_assert!(!short.is_mastered());
        prop_assert!(full.is_mastered());
    }

    #[test]
    fn schedule_stays_in_range(stage in 0u32..20, grade in grade(), offset in 0i64..1_000_000) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(offset);
        let plan = plan_next_review(stage, grade, now);
        prop_assert!(plan.next_stage <= MAX_STAGE);
        prop_assert!(plan.due_at > now);
        prop_assert_eq!(plan.lapse_increment, u32::from(grade == Grade::Unknown));
    }

    #[test]
    fn rating_is_bounded_and_consistent(
        grades in prop::collection::vec((grade(), -60i64..60), 0..50),
        stage in 0u32..40,
        lapses in 0u32..100,
        seen in 0u32..200,
        due_offset in prop::option::of(-1000i64..1000),
    ) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let logs: Vec<ReviewLog> = grades
            .iter()
            .map(|(grade, days)| ReviewLog {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                word_id: Uuid::nil(),
                grade: *grade,
                revealed_answer: false,
                reviewed_at: now - Duration::days(*days),
            })
            .collect();

        let rating = rate_memory(RatingInput {
            stage,
            due_at: due_offset.map(|days| now + Duration::days(days)),
            lapse_count: lapses,
            seen_count: seen,
            logs: &logs,
            now,
        });
        prop_assert!(rating.score <= 100);
        prop_assert_eq!(rating.level, MemoryLevel::from_score(rating.score));
    }
}
