use speculate2::speculate;
use tempfile::TempDir;
use uuid::Uuid;
use wordladder::db::Database;
use wordladder::models::*;
use wordladder::StudyService;

fn open(dir: &TempDir) -> Database {
    let db = Database::open(dir.path().join("nested").join("wordladder.db"))
        .expect("Failed to open database");
    db.migrate().expect("Failed to run migrations");
    db
}

speculate! {
    before {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let user = Uuid::new_v4();
    }

    describe "file-backed database" {
        it "creates missing parent directories" {
            open(&dir);
            assert!(dir.path().join("nested").join("wordladder.db").exists());
        }

        it "keeps rounds and sessions across reopen" {
            let (round_id, session_id) = {
                let study = StudyService::new(open(&dir), user);
                let word = study.add_word(CreateWordInput::new("Baum", "de")).expect("Failed to add word");
                let round = study.create_round(CreateRoundInput {
                    name: "Trees".to_string(),
                    word_ids: vec![word.id],
                }).expect("Failed to create round");
                let session = study.start_session(round.id, SessionType::Normal).expect("start failed");
                study.save_session_progress(session.id, vec![SessionResult::new(word.id, Grade::Fuzzy)])
                    .expect("save failed");
                (round.id, session.id)
            };

            let study = StudyService::new(open(&dir), user);
            let session = study.get_session(session_id).expect("Query failed");
            assert_eq!(session.round_id, round_id);
            assert_eq!(session.results.len(), 1);

            let resumed = study.start_session(round_id, SessionType::Normal).expect("start failed");
            assert_eq!(resumed.id, session_id);
        }

        it "keeps settings across reopen" {
            {
                let study = StudyService::new(open(&dir), user);
                study.update_settings(UpdateSettingsInput {
                    freeze_rounds: Some(5),
                    ..Default::default()
                }).expect("update failed");
            }

            let study = StudyService::new(open(&dir), user);
            assert_eq!(study.settings().expect("Query failed").freeze_rounds, 5);
        }
    }
}
