use chrono::NaiveDate;
use constancy_core::db::open_db_in_memory;
use constancy_core::{
    AttrType, AttrValue, ConstancyRule, Record, RecordRepository, RecordSchema, RecordService,
    SqliteRecordRepository, DEFAULT_CONSTANCY_MESSAGE,
};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn changed_ssn_reports_exactly_one_error_and_name_changes_pass() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("name", AttrType::Text)
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .build()
        .unwrap();
    let mut citizen = loaded(&schema, [("name", "John"), ("ssn", "123-45-6789")]);

    citizen.set("ssn", "999-99-9999").unwrap();
    assert!(!citizen.validate());
    assert_eq!(citizen.errors().len(), 1);
    assert_eq!(citizen.errors().on("ssn"), vec![DEFAULT_CONSTANCY_MESSAGE]);

    citizen.set("ssn", "123-45-6789").unwrap();
    citizen.set("name", "Jane").unwrap();
    assert!(citizen.validate());
}

#[test]
fn reassigning_date_to_its_text_form_is_not_a_change() {
    let schema = RecordSchema::builder("Milestone")
        .attribute("important_on", AttrType::Date)
        .validates_constancy_of(ConstancyRule::new(["important_on"]))
        .build()
        .unwrap();
    let important_on = NaiveDate::from_ymd_opt(2004, 2, 29).unwrap();
    let mut milestone = loaded(&schema, [("important_on", AttrValue::from(important_on))]);

    milestone.set("important_on", "2004-02-29").unwrap();
    assert!(milestone.validate());

    milestone.set("important_on", important_on).unwrap();
    assert!(milestone.validate());
}

#[test]
fn several_changed_attributes_are_reported_in_declaration_order() {
    let schema = RecordSchema::builder("Account")
        .attribute("region", AttrType::Text)
        .attribute("owner", AttrType::Text)
        .attribute("opened_on", AttrType::Date)
        .attribute("tier", AttrType::Integer)
        .validates_constancy_of(ConstancyRule::new(["tier", "owner", "opened_on", "region"]))
        .build()
        .unwrap();
    let mut account = loaded(
        &schema,
        [
            ("region", AttrValue::from("eu")),
            ("owner", AttrValue::from("ana")),
            ("opened_on", AttrValue::from("2020-01-01")),
            ("tier", AttrValue::from(1_i64)),
        ],
    );

    account.set("region", "us").unwrap();
    account.set("tier", "2").unwrap();
    account.set("opened_on", "2020-01-01").unwrap();
    assert!(!account.validate());

    let attributes: Vec<_> = account
        .errors()
        .iter()
        .map(|error| error.attribute.as_str())
        .collect();
    assert_eq!(attributes, vec!["tier", "region"]);
}

#[test]
fn never_persisted_records_are_exempt() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .build()
        .unwrap();
    let mut citizen = Record::with_attributes(&schema, [("ssn", "123-45-6789")]).unwrap();

    citizen.set("ssn", "999-99-9999").unwrap();
    assert!(citizen.validate());
    assert!(citizen.original_attributes().is_none());
}

#[test]
fn false_guard_suppresses_all_constancy_errors() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .attribute("locked", AttrType::Boolean)
        .validates_constancy_of(
            ConstancyRule::new(["ssn"])
                .when(|record| record.get("locked") == Some(&AttrValue::Boolean(true))),
        )
        .build()
        .unwrap();
    let mut citizen = loaded(
        &schema,
        [("ssn", AttrValue::from("123-45-6789")), ("locked", AttrValue::from(false))],
    );

    citizen.set("ssn", "999-99-9999").unwrap();
    assert!(citizen.validate());

    citizen.set("locked", true).unwrap();
    assert!(!citizen.validate());
}

#[test]
fn unless_guard_skips_matching_records() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .attribute("admin_override", AttrType::Boolean)
        .validates_constancy_of(
            ConstancyRule::new(["ssn"])
                .unless(|record| record.get("admin_override") == Some(&AttrValue::Boolean(true))),
        )
        .build()
        .unwrap();
    let mut citizen = loaded(
        &schema,
        [("ssn", AttrValue::from("123-45-6789")), ("admin_override", AttrValue::from(true))],
    );

    citizen.set("ssn", "999-99-9999").unwrap();
    assert!(citizen.validate());
}

#[test]
fn capture_observes_values_adjusted_by_earlier_load_hooks() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .after_load(|record| {
            let trimmed = record
                .get("ssn")
                .and_then(AttrValue::as_text)
                .map(|ssn| ssn.trim().to_string());
            if let Some(trimmed) = trimmed {
                let _ = record.set("ssn", trimmed);
            }
        })
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .build()
        .unwrap();
    let mut citizen = loaded(&schema, [("ssn", "  123-45-6789  ")]);

    assert_eq!(
        citizen.original_attributes().unwrap().get("ssn"),
        Some(&AttrValue::from("123-45-6789"))
    );
    assert!(citizen.validate());
}

#[test]
fn capture_observes_hooks_registered_after_the_declaration() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .after_load(|record| {
            let trimmed = record
                .get("ssn")
                .and_then(AttrValue::as_text)
                .map(|ssn| ssn.trim().to_string());
            if let Some(trimmed) = trimmed {
                let _ = record.set("ssn", trimmed);
            }
        })
        .build()
        .unwrap();
    let mut citizen = loaded(&schema, [("ssn", " 123 ")]);

    assert_eq!(citizen.get("ssn"), Some(&AttrValue::from("123")));
    assert_eq!(
        citizen.original_attributes().unwrap().get("ssn"),
        Some(&AttrValue::from("123"))
    );
    assert!(citizen.validate());
}

#[test]
fn type_without_declaration_loads_without_snapshot() {
    let schema = RecordSchema::builder("Note")
        .attribute("body", AttrType::Text)
        .build()
        .unwrap();
    let mut note = loaded(&schema, [("body", "draft")]);

    assert!(note.original_attributes().is_none());
    note.set("body", "final").unwrap();
    assert!(note.validate());
}

#[test]
fn constancy_errors_interleave_with_other_validations_by_registration_order() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("name", AttrType::Text)
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .validates_presence_of(["name"])
        .build()
        .unwrap();
    let mut citizen = loaded(&schema, [("name", "John"), ("ssn", "123-45-6789")]);

    citizen.set("ssn", "000-00-0000").unwrap();
    citizen.set("name", "").unwrap();
    assert!(!citizen.validate());
    assert_eq!(
        citizen.errors().full_messages(),
        vec![
            "Ssn can't be changed".to_string(),
            "Name can't be blank".to_string(),
        ]
    );
}

#[test]
fn snapshot_is_not_recaptured_by_updates_but_is_replaced_by_reload() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("name", AttrType::Text)
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn).unwrap());

    let mut citizen =
        Record::with_attributes(&schema, [("name", "John"), ("ssn", "123-45-6789")]).unwrap();
    service.save(&mut citizen).unwrap();

    citizen.set("name", "Johnny").unwrap();
    service.save(&mut citizen).unwrap();
    assert_eq!(
        citizen.original_attributes().unwrap().get("ssn"),
        Some(&AttrValue::from("123-45-6789"))
    );

    citizen.set("ssn", "999-99-9999").unwrap();
    assert!(service.save(&mut citizen).is_err());

    service.reload(&mut citizen).unwrap();
    assert_eq!(citizen.get("ssn"), Some(&AttrValue::from("123-45-6789")));
    assert_eq!(citizen.get("name"), Some(&AttrValue::from("Johnny")));
    assert!(citizen.validate());
}

#[test]
fn independent_instances_of_one_row_keep_their_own_snapshot() {
    let schema = RecordSchema::builder("Citizen")
        .attribute("ssn", AttrType::Text)
        .validates_constancy_of(ConstancyRule::new(["ssn"]))
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn).unwrap();
    let mut original = Record::with_attributes(&schema, [("ssn", "123-45-6789")]).unwrap();
    let id = repo.create_record(&mut original).unwrap();

    let mut first = repo.find_record(&schema, id).unwrap().unwrap();
    let second = repo.find_record(&schema, id).unwrap().unwrap();
    first.set("ssn", "999-99-9999").unwrap();

    assert!(!first.validate());
    assert_eq!(
        second.original_attributes().unwrap().get("ssn"),
        Some(&AttrValue::from("123-45-6789"))
    );
}

fn loaded<I, V>(schema: &Arc<RecordSchema>, values: I) -> Record
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<AttrValue>,
{
    let stored = values
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.into()));
    Record::from_storage(schema, Uuid::new_v4(), stored).unwrap()
}
