use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use constancy_core::db::open_db_in_memory;
use constancy_core::{
    AttrType, AttrValue, ConstancyRule, Record, RecordId, RecordRepository, RecordSchema,
    RepoError, SqliteRecordRepository,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Fixture {
    conn: Connection,
    schema: Arc<RecordSchema>,
    load_count: Arc<AtomicUsize>,
    john_doe: RecordId,
}

#[test]
fn john_doe_is_valid() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    assert!(person.validate());
    assert!(person.errors().is_empty());
}

#[test]
fn john_doe_with_changed_name_is_valid() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    person.set("name", "Jane Doe").unwrap();
    assert!(person.validate());
}

#[test]
fn john_doe_with_changed_social_security_number_has_error() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    person.set("social_security_number", "555-55-5555").unwrap();
    assert!(!person.validate());
    assert_eq!(
        person.errors().full_messages(),
        vec!["Social security number can't be changed".to_string()]
    );
}

#[test]
fn john_doe_with_changed_first_speeding_ticket_at_has_error() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    let two_months_ago = Local::now().naive_local() - Duration::days(60);
    person.set("first_speeding_ticket_at", two_months_ago).unwrap();
    assert!(!person.validate());
    assert_eq!(
        person.errors().full_messages(),
        vec!["First speeding ticket at can't be changed".to_string()]
    );
}

#[test]
fn john_doe_with_stringified_first_speeding_ticket_at_is_valid() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    person.set("first_speeding_ticket_at", "1999-09-09").unwrap();
    assert!(person.validate());
}

#[test]
fn rejected_update_is_not_written_and_keeps_in_memory_value() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = load_john_doe(&fx, &repo);

    person.set("social_security_number", "555-55-5555").unwrap();
    let err = repo.update_record(&mut person).unwrap_err();
    match err {
        RepoError::Validation(failure) => {
            assert_eq!(failure.record_id, fx.john_doe);
            assert_eq!(failure.errors.on("social_security_number"), vec!["can't be changed"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        person.get("social_security_number"),
        Some(&AttrValue::from("555-55-5555"))
    );
    assert_eq!(person.errors().len(), 1);

    let stored = load_john_doe(&fx, &repo);
    assert_eq!(
        stored.get("social_security_number"),
        Some(&AttrValue::from("123-45-6789"))
    );
}

#[test]
fn new_person_is_valid() {
    let fx = setup();
    let mut person = Record::new(&fx.schema);

    assert!(person.validate());
}

#[test]
fn new_person_runs_user_after_load_hook_once_per_load() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = Record::new(&fx.schema);
    let before = fx.load_count.load(Ordering::SeqCst);

    repo.create_record(&mut person).unwrap();
    assert_eq!(fx.load_count.load(Ordering::SeqCst), before);

    let found = repo.find_record(&fx.schema, person.id()).unwrap().unwrap();
    assert_eq!(fx.load_count.load(Ordering::SeqCst), before + 1);
    assert!(found.original_attributes().is_some());
}

#[test]
fn new_person_with_changed_name_is_valid() {
    let fx = setup();
    let mut person = Record::with_attributes(&fx.schema, [("name", "John Doe")]).unwrap();

    person.set("name", "Jane Doe").unwrap();
    assert!(person.validate());
}

#[test]
fn new_saved_person_with_name_stays_valid_when_name_changes() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person = Record::with_attributes(&fx.schema, [("name", "John Doe")]).unwrap();
    repo.create_record(&mut person).unwrap();
    assert!(person.validate());

    person.set("name", "Jane").unwrap();
    assert!(person.validate());
    repo.update_record(&mut person).unwrap();
}

#[test]
fn new_person_with_changed_social_security_number_is_valid() {
    let fx = setup();
    let mut person =
        Record::with_attributes(&fx.schema, [("social_security_number", "987-65-4321")]).unwrap();

    person.set("social_security_number", "555-55-5555").unwrap();
    assert!(person.validate());
}

#[test]
fn new_saved_person_rejects_changed_social_security_number() {
    let fx = setup();
    let repo = SqliteRecordRepository::try_new(&fx.conn).unwrap();
    let mut person =
        Record::with_attributes(&fx.schema, [("social_security_number", "987-65-4321")]).unwrap();
    repo.create_record(&mut person).unwrap();
    assert!(person.validate());

    person.set("social_security_number", "000-00-0000").unwrap();
    assert!(!person.validate());
    assert_eq!(
        person.errors().full_messages(),
        vec!["Social security number can't be changed".to_string()]
    );
}

fn setup() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let load_count = Arc::new(AtomicUsize::new(0));
    let schema = person_schema(Arc::clone(&load_count));

    let john_doe = {
        let repo = SqliteRecordRepository::try_new(&conn).unwrap();
        let mut person = Record::with_attributes(
            &schema,
            [
                ("name", AttrValue::from("John Doe")),
                ("social_security_number", AttrValue::from("123-45-6789")),
                ("first_speeding_ticket_at", AttrValue::from(ticket_at())),
            ],
        )
        .unwrap();
        repo.create_record(&mut person).unwrap()
    };

    Fixture {
        conn,
        schema,
        load_count,
        john_doe,
    }
}

fn person_schema(load_count: Arc<AtomicUsize>) -> Arc<RecordSchema> {
    RecordSchema::builder("Person")
        .attribute("name", AttrType::Text)
        .attribute("social_security_number", AttrType::Text)
        .attribute("first_speeding_ticket_at", AttrType::DateTime)
        .after_load(move |_| {
            load_count.fetch_add(1, Ordering::SeqCst);
        })
        .validates_constancy_of(ConstancyRule::new([
            "social_security_number",
            "first_speeding_ticket_at",
        ]))
        .build()
        .unwrap()
}

fn load_john_doe(fx: &Fixture, repo: &SqliteRecordRepository<'_>) -> Record {
    repo.find_record(&fx.schema, fx.john_doe).unwrap().unwrap()
}

fn ticket_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1999, 9, 9)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}
