use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use uuid::Uuid;

use santa_db::Database;
use santa_db::models::{NewEvent, NewMember, RegisterOutcome};
use santa_engine::{Caller, Engine, EngineError, FixedClock};
use santa_types::models::{EventStatus, RevealMode, Role};

struct Exchange {
    db: Database,
    owner: Caller,
    event_id: Uuid,
    /// alias -> user id
    members: HashMap<String, Uuid>,
}

fn party_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 12, 22, 19, 30, 0).unwrap()
}

fn setup(db: Database, reveal_mode: RevealMode, allow_single: bool, aliases: &[&str]) -> Exchange {
    let owner_id = Uuid::new_v4();
    assert!(db.upsert_admin(&owner_id.to_string(), "organizer", "hash").unwrap());

    let event_id = Uuid::new_v4();
    assert!(db
        .create_event(&NewEvent {
            id: &event_id.to_string(),
            owner_id: &owner_id.to_string(),
            code: "NORTHPOLE",
            name: "Team exchange",
            event_date: party_date(),
            budget_max: 30,
            allow_single,
            reveal_mode: reveal_mode.as_str(),
        })
        .unwrap());

    let event = event_id.to_string();
    let mut members = HashMap::new();
    for alias in aliases {
        let user_id = Uuid::new_v4();
        let participant_id = Uuid::new_v4().to_string();
        let wishlist = format!("something for {alias}");
        let member = NewMember {
            event_id: &event,
            participant_id: &participant_id,
            alias: "",
            wishlist: &wishlist,
        };
        let outcome = db
            .register_user(&user_id.to_string(), alias, "hash", Some(&member))
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered);
        members.insert(alias.to_string(), user_id);
    }

    Exchange {
        db,
        owner: Caller::new(owner_id, Role::Admin),
        event_id,
        members,
    }
}

/// (giver, receiver, sealed_at) rows straight from the table.
fn assignment_rows(db: &Database, event_id: Uuid) -> Vec<(String, Option<String>, Option<String>)> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT giver_id, receiver_id, sealed_at FROM assignments WHERE event_id = ?1",
        )?;
        let rows = stmt
            .query_map([event_id.to_string()], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .unwrap()
}

fn temp_db_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("santa-test-{}.db", Uuid::new_v4()))
}

#[test]
fn odd_roster_with_singleton_end_to_end() {
    let ex = setup(
        Database::open_in_memory().unwrap(),
        RevealMode::OnLock,
        true,
        &["A", "B", "C", "D", "E"],
    );
    let now = party_date() - Duration::days(7);
    let engine = Engine::new(&ex.db, FixedClock(now));
    let mut rng = StdRng::seed_from_u64(2026);

    let out = engine.generate(ex.event_id, &ex.owner, &mut rng).unwrap();
    assert_eq!((out.pairs, out.singles), (4, 1));

    let rows = assignment_rows(&ex.db, ex.event_id);
    assert_eq!(rows.len(), 5);
    let paired: HashMap<&str, &str> = rows
        .iter()
        .filter_map(|(g, r, _)| r.as_deref().map(|r| (g.as_str(), r)))
        .collect();
    assert_eq!(paired.len(), 4);
    let givers: HashSet<&str> = paired.keys().copied().collect();
    let receivers: HashSet<&str> = paired.values().copied().collect();
    assert_eq!(givers, receivers, "the four pairs form a closed cycle");

    let lock = engine.lock(ex.event_id, &ex.owner).unwrap();
    assert_eq!(lock.sealed, 5);
    let rows = assignment_rows(&ex.db, ex.event_id);
    assert!(rows.iter().all(|(_, _, sealed)| sealed.is_some()));

    let summary = engine.summary(ex.event_id, &ex.owner).unwrap();
    assert_eq!(summary.event.status, EventStatus::Locked);
    assert_eq!((summary.participants, summary.pairs, summary.singles), (5, 4, 1));

    let mut singletons = 0;
    for (alias, user_id) in &ex.members {
        let reveal = engine.my_assignment(ex.event_id, *user_id).unwrap();
        assert!(reveal.can_reveal);
        match reveal.receiver {
            Some(receiver) => {
                assert_ne!(&receiver.alias, alias);
                assert_eq!(receiver.wishlist, format!("something for {}", receiver.alias));
            }
            None => singletons += 1,
        }
    }
    assert_eq!(singletons, 1);
}

#[test]
fn regenerate_never_duplicates_rows() {
    let ex = setup(
        Database::open_in_memory().unwrap(),
        RevealMode::OnDate,
        false,
        &["ana", "bo", "cy", "di"],
    );
    let engine = Engine::new(&ex.db, FixedClock(party_date()));
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..5 {
        engine.generate(ex.event_id, &ex.owner, &mut rng).unwrap();
        assert_eq!(assignment_rows(&ex.db, ex.event_id).len(), 4);
    }
}

#[test]
fn lock_unlock_cycle() {
    let ex = setup(
        Database::open_in_memory().unwrap(),
        RevealMode::OnLock,
        false,
        &["ana", "bo"],
    );
    let engine = Engine::new(&ex.db, FixedClock(party_date()));

    assert!(matches!(
        engine.lock(ex.event_id, &ex.owner).unwrap_err(),
        EngineError::NotGenerated
    ));

    engine
        .generate(ex.event_id, &ex.owner, &mut StdRng::seed_from_u64(3))
        .unwrap();
    engine.lock(ex.event_id, &ex.owner).unwrap();
    assert!(matches!(
        engine.lock(ex.event_id, &ex.owner).unwrap_err(),
        EngineError::AlreadyLocked
    ));

    engine.unlock(ex.event_id, &ex.owner).unwrap();
    let summary = engine.summary(ex.event_id, &ex.owner).unwrap();
    assert_eq!(summary.event.status, EventStatus::Draft);
    assert_eq!((summary.pairs, summary.singles), (0, 0));
    assert!(assignment_rows(&ex.db, ex.event_id).is_empty());

    assert!(matches!(
        engine.unlock(ex.event_id, &ex.owner).unwrap_err(),
        EngineError::NotLocked
    ));
}

#[test]
fn roster_change_discards_draft_assignments() {
    let ex = setup(
        Database::open_in_memory().unwrap(),
        RevealMode::OnLock,
        false,
        &["ana", "bo", "cy", "di"],
    );
    let engine = Engine::new(&ex.db, FixedClock(party_date()));
    engine
        .generate(ex.event_id, &ex.owner, &mut StdRng::seed_from_u64(3))
        .unwrap();

    let leaving = ex.members["cy"];
    ex.db
        .leave_event(&ex.event_id.to_string(), &leaving.to_string())
        .unwrap();
    assert!(assignment_rows(&ex.db, ex.event_id).is_empty());
    assert!(matches!(
        engine.lock(ex.event_id, &ex.owner).unwrap_err(),
        EngineError::NotGenerated
    ));

    assert!(matches!(
        engine
            .generate(ex.event_id, &ex.owner, &mut StdRng::seed_from_u64(3))
            .unwrap_err(),
        EngineError::InsufficientParticipants
    ));
}

#[test]
fn on_date_reveal_on_file_database() {
    let path = temp_db_path();
    let ex = setup(
        Database::open(&path).unwrap(),
        RevealMode::OnDate,
        false,
        &["ana", "bo"],
    );
    Engine::new(&ex.db, FixedClock(party_date()))
        .generate(ex.event_id, &ex.owner, &mut StdRng::seed_from_u64(9))
        .unwrap();

    let ana = ex.members["ana"];
    let early = Engine::new(&ex.db, FixedClock(party_date() - Duration::hours(1)));
    let reveal = early.my_assignment(ex.event_id, ana).unwrap();
    assert!(!reveal.can_reveal);
    assert!(reveal.receiver.is_none());

    let on_time = Engine::new(&ex.db, FixedClock(party_date()));
    let reveal = on_time.my_assignment(ex.event_id, ana).unwrap();
    assert_eq!(reveal.receiver.map(|r| r.alias).as_deref(), Some("bo"));

    drop(ex);
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
    }
}

#[test]
fn concurrent_transitions_never_tear_the_assignment_set() {
    let path = temp_db_path();
    let ex = setup(
        Database::open(&path).unwrap(),
        RevealMode::OnLock,
        true,
        &["A", "B", "C", "D", "E", "F", "G"],
    );
    let reader = ex.members["D"];

    std::thread::scope(|scope| {
        for seed in 0..8u64 {
            let ex = &ex;
            scope.spawn(move || {
                let engine = Engine::new(&ex.db, FixedClock(party_date()));
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..200 {
                    let result = match rng.random_range(0..3) {
                        0 => engine.generate(ex.event_id, &ex.owner, &mut rng).map(|_| ()),
                        1 => engine.lock(ex.event_id, &ex.owner).map(|_| ()),
                        _ => engine.unlock(ex.event_id, &ex.owner),
                    };
                    match result {
                        Ok(())
                        | Err(EngineError::AlreadyLocked)
                        | Err(EngineError::NotLocked)
                        | Err(EngineError::NotGenerated) => {}
                        Err(other) => panic!("unexpected failure: {other}"),
                    }

                    let summary = engine.summary(ex.event_id, &ex.owner).unwrap();
                    let total = summary.pairs + summary.singles;
                    assert!(total == 0 || total == 7, "torn set of {total}");
                    if summary.event.status == EventStatus::Locked {
                        assert_eq!((summary.pairs, summary.singles), (6, 1));
                    }

                    let reveal = engine.my_assignment(ex.event_id, reader).unwrap();
                    if !reveal.can_reveal {
                        assert!(reveal.receiver.is_none());
                    }
                }
            });
        }
    });

    drop(ex);
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
    }
}
