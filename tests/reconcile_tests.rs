use chrono::{NaiveDate, NaiveTime};
use rphotopunch::core::{MergeRejection, Reconciliation, parse_filename, reconcile};
use rphotopunch::models::{AttachmentList, AttendanceEvent, AttendanceRecord};

const LIMIT: usize = 500;

fn ev(name: &str) -> AttendanceEvent {
    parse_filename(name).unwrap()
}

fn t(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

fn record(id: i64, start: NaiveTime, end: NaiveTime, files: &[&str]) -> AttendanceRecord {
    AttendanceRecord {
        id,
        person: "Joao Silva".into(),
        project: "Obra12".into(),
        date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        start_time: start,
        end_time: end,
        attachments: AttachmentList::from_names(files),
    }
}

/// Apply a decision to an in-memory "table" of one key.
fn apply(records: &mut Vec<AttendanceRecord>, decision: Reconciliation) {
    match decision {
        Reconciliation::Create(new) => records.push(AttendanceRecord {
            id: records.len() as i64 + 1,
            person: new.person,
            project: new.project,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            attachments: new.attachments,
        }),
        Reconciliation::Update(upd) => {
            let r = records.iter_mut().find(|r| r.id == upd.id).unwrap();
            r.start_time = upd.start_time;
            r.end_time = upd.end_time;
            r.attachments = upd.attachments;
        }
        Reconciliation::Rejected(_) => {}
    }
}

const MORNING: &str = "Joao_Silva_Obra12_2024.03.05.08.15.00.jpg";
const EVENING: &str = "Joao_Silva_Obra12_2024.03.05.17.40.00.jpg";
const NOON: &str = "Joao_Silva_Obra12_2024.03.05.12.00.00.jpg";

#[test]
fn first_event_creates_a_point_interval() {
    match reconcile(&ev(MORNING), &[], LIMIT) {
        Reconciliation::Create(new) => {
            assert_eq!(new.start_time, t(8, 15, 0));
            assert_eq!(new.end_time, t(8, 15, 0));
            assert_eq!(new.attachments.serialized(), MORNING);
        }
        other => panic!("expected create, got {other:?}"),
    }
}

#[test]
fn second_event_widens_and_appends() {
    let existing = [record(1, t(8, 15, 0), t(8, 15, 0), &[MORNING])];

    match reconcile(&ev(EVENING), &existing, LIMIT) {
        Reconciliation::Update(upd) => {
            assert_eq!(upd.id, 1);
            assert_eq!(upd.start_time, t(8, 15, 0));
            assert_eq!(upd.end_time, t(17, 40, 0));
            assert_eq!(upd.attachments.serialized(), format!("{MORNING},{EVENING}"));
            assert!(upd.conflicting_ids.is_empty());
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn earlier_event_moves_start_only() {
    let existing = [record(1, t(12, 0, 0), t(17, 40, 0), &[NOON, EVENING])];

    let Reconciliation::Update(upd) = reconcile(&ev(MORNING), &existing, LIMIT) else {
        panic!("expected update");
    };
    assert_eq!(upd.start_time, t(8, 15, 0));
    assert_eq!(upd.end_time, t(17, 40, 0));
    assert_eq!(upd.attachments.len(), 3);
}

#[test]
fn reconciling_twice_equals_once() {
    let mut once = Vec::new();
    let decision = reconcile(&ev(MORNING), &once, LIMIT);
    apply(&mut once, decision);

    let mut twice = once.clone();
    let again = reconcile(&ev(MORNING), &twice, LIMIT);
    if let Reconciliation::Update(upd) = &again {
        assert!(upd.is_noop(&twice[0]));
    } else {
        panic!("expected a no-op update, got {again:?}");
    }
    apply(&mut twice, again);

    assert_eq!(once, twice);
}

#[test]
fn interval_is_monotonic_whatever_the_order() {
    let names = [
        NOON,
        EVENING,
        MORNING,
        "Joao_Silva_Obra12_2024.03.05.10.30.00.jpg",
        "Joao_Silva_Obra12_2024.03.05.06.59.59.jpg",
        "Joao_Silva_Obra12_2024.03.05.18.00.01.jpg",
    ];

    let mut records = Vec::new();
    let mut prev: Option<(NaiveTime, NaiveTime)> = None;

    for n in names {
        let decision = reconcile(&ev(n), &records, LIMIT);
        apply(&mut records, decision);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert!(r.start_time <= r.end_time);
        if let Some((s, e)) = prev {
            assert!(r.start_time <= s, "start grew after {n}");
            assert!(r.end_time >= e, "end shrank after {n}");
        }
        prev = Some((r.start_time, r.end_time));
    }

    let r = &records[0];
    assert_eq!(r.start_time, t(6, 59, 59));
    assert_eq!(r.end_time, t(18, 0, 1));
    assert_eq!(r.attachments.len(), names.len());
}

#[test]
fn merge_past_the_limit_is_rejected() {
    // 41 chars per name: 12 names + 11 commas = 503 > 500
    let names: Vec<String> = (0..12)
        .map(|i| format!("Joao_Silva_Obra12_2024.03.05.08.{i:02}.00.jpg"))
        .collect();
    assert_eq!(names[0].len(), 41);

    let mut records = Vec::new();
    for n in &names[..11] {
        let decision = reconcile(&ev(n), &records, LIMIT);
        apply(&mut records, decision);
    }
    assert_eq!(records[0].attachments.serialized_len(), 11 * 41 + 10);
    let before = records.clone();

    match reconcile(&ev(&names[11]), &records, LIMIT) {
        Reconciliation::Rejected(MergeRejection::Overflow {
            record_id, len, limit, ..
        }) => {
            assert_eq!(record_id, Some(1));
            assert_eq!(len, 503);
            assert_eq!(limit, LIMIT);
        }
        other => panic!("expected overflow, got {other:?}"),
    }

    // an already-known file still reconciles (idempotence survives a full list)
    assert!(matches!(
        reconcile(&ev(&names[0]), &records, LIMIT),
        Reconciliation::Update(_)
    ));
    assert_eq!(records, before);
}

#[test]
fn a_single_name_longer_than_the_limit_is_refused() {
    assert!(matches!(
        reconcile(&ev(MORNING), &[], 10),
        Reconciliation::Rejected(MergeRejection::Overflow { record_id: None, .. })
    ));
}

#[test]
fn duplicates_target_the_lowest_id_and_report_the_others() {
    let existing = [
        record(7, t(9, 0, 0), t(9, 0, 0), &["b.jpg"]),
        record(3, t(10, 0, 0), t(11, 0, 0), &["a.jpg"]),
    ];

    let Reconciliation::Update(upd) = reconcile(&ev(EVENING), &existing, LIMIT) else {
        panic!("expected update");
    };
    assert_eq!(upd.id, 3);
    assert_eq!(upd.conflicting_ids, vec![7]);
    // interval spans every duplicate
    assert_eq!(upd.start_time, t(9, 0, 0));
    assert_eq!(upd.end_time, t(17, 40, 0));
    // attachments come from the target only
    assert_eq!(upd.attachments.serialized(), format!("a.jpg,{EVENING}"));
}

#[test]
fn key_matching_is_case_sensitive() {
    let mut other_case = record(1, t(8, 0, 0), t(8, 0, 0), &["x.jpg"]);
    other_case.person = "joao silva".into();

    assert!(matches!(
        reconcile(&ev(MORNING), &[other_case], LIMIT),
        Reconciliation::Create(_)
    ));
}

#[test]
fn records_of_another_day_are_ignored() {
    let mut yesterday = record(1, t(8, 0, 0), t(9, 0, 0), &["x.jpg"]);
    yesterday.date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    assert!(matches!(
        reconcile(&ev(MORNING), &[yesterday], LIMIT),
        Reconciliation::Create(_)
    ));
}

#[test]
fn overflow_converts_to_an_app_error() {
    let Reconciliation::Rejected(rejection) = reconcile(&ev(MORNING), &[], 10) else {
        panic!("expected a rejection");
    };
    let err: rphotopunch::errors::AppError = rejection.into();
    assert!(matches!(
        err,
        rphotopunch::errors::AppError::MergeOverflow { len: 41, limit: 10, .. }
    ));
}
