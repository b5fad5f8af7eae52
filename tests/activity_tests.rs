use chrono::NaiveTime;
use rphotopunch::core::activity::{register, validate_new_activity, validate_registration};
use rphotopunch::db::activities::{activities_of_project, list_activities_for_project};
use rphotopunch::db::projects::insert_project;
use rphotopunch::db::{AttendanceStore, DbPool, SqliteStore};
use rphotopunch::errors::AppError;
use rphotopunch::models::activity::{NewActivity, RegisterActivityRequest, RegistrationOutcome};
use rphotopunch::models::project::NewProject;
use std::sync::Arc;

fn t(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

fn project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        company: "ACME".into(),
        owner: "Carla".into(),
        deadline: None,
        estimated_hours: Some("120h".into()),
        layout: None,
    }
}

/// In-memory store with one project, `Obra12`.
fn store_with_project() -> (DbPool, i64, Arc<dyn AttendanceStore>) {
    let pool = DbPool::in_memory().unwrap();
    let id = pool.with_conn(|conn| insert_project(conn, &project("Obra12"))).unwrap();
    let store: Arc<dyn AttendanceStore> = Arc::new(SqliteStore::new(pool.clone()));
    (pool, id, store)
}

fn request(person: &str, start: &str, end: &str, attachments: &str) -> RegisterActivityRequest {
    RegisterActivityRequest {
        person: Some(person.into()),
        date: Some("05-03-2024".into()),
        start_time: Some(start.into()),
        end_time: Some(end.into()),
        project: Some("Obra12".into()),
        attachments: Some(attachments.into()),
        project_valid: Some(true),
    }
}

#[test]
fn invalid_project_flag_is_refused() {
    let mut req = request("Joao Silva", "08:15:00", "17:40:00", "a.jpg");
    req.project_valid = Some(false);
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));

    req.project_valid = None;
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));
}

#[test]
fn missing_fields_are_refused() {
    let mut req = request("Joao Silva", "08:15:00", "17:40:00", "a.jpg");
    req.person = Some("   ".into());
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));

    let mut req = request("Joao Silva", "08:15:00", "17:40:00", "a.jpg");
    req.date = None;
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));

    let req = request("Joao Silva", "08:15:00", "17:40:00", " , ");
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));
}

#[test]
fn bad_date_or_reversed_interval_is_refused() {
    let mut req = request("Joao Silva", "08:15:00", "17:40:00", "a.jpg");
    req.date = Some("2024-03-05".into());
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));

    let req = request("Joao Silva", "18:00:00", "08:00:00", "a.jpg");
    assert!(matches!(validate_registration(&req), Err(AppError::Validation(_))));
}

#[test]
fn a_valid_request_is_normalized() {
    let reg = validate_registration(&request("Joao Silva", "08:15", "17:40:00", "a.jpg, b.jpg,a.jpg")).unwrap();
    assert_eq!(reg.start_time, t(8, 15, 0));
    assert_eq!(reg.end_time, t(17, 40, 0));
    assert_eq!(reg.attachments.serialized(), "a.jpg,b.jpg");
}

#[test]
fn wire_names_from_the_attendance_ui_are_accepted() {
    let req: RegisterActivityRequest = serde_json::from_str(
        r#"{"Nome":"Joao Silva","Data":"05-03-2024","horaInicial":"08:15:00",
            "horaFinal":"17:40:00","Projeto":"Obra12","Anexo":"a.jpg","ProjetoValido":true}"#,
    )
    .unwrap();
    let reg = validate_registration(&req).unwrap();
    assert_eq!(reg.person, "Joao Silva");
    assert_eq!(reg.project, "Obra12");
}

#[tokio::test]
async fn unknown_project_writes_nothing() {
    let (pool, project_id, store) = store_with_project();
    let mut req = request("Joao Silva", "08:15:00", "17:40:00", "a.jpg");
    req.project = Some("Obra99".into());

    let err = register(store, req).await.unwrap_err();
    assert!(matches!(err, AppError::ProjectNotFound(ref p) if p == "Obra99"), "{err:?}");

    let rows = pool.with_conn(|conn| activities_of_project(conn, project_id)).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn failed_write_rolls_the_registration_back() {
    let (pool, project_id, store) = store_with_project();
    pool.with_conn(|conn| {
        Ok(conn.execute_batch(
            "CREATE TRIGGER refuse_activity BEFORE INSERT ON activity_logs
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )?)
    })
    .unwrap();

    let err = register(store.clone(), request("Joao Silva", "08:15:00", "17:40:00", "a.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Db(_)), "{err:?}");

    let rows = pool.with_conn(|conn| activities_of_project(conn, project_id)).unwrap();
    assert!(rows.is_empty());
    // no transaction left open on the shared connection
    assert!(pool.with_conn(|conn| Ok(conn.is_autocommit())).unwrap());

    pool.with_conn(|conn| Ok(conn.execute_batch("DROP TRIGGER refuse_activity;")?))
        .unwrap();
    let outcome = register(store, request("Joao Silva", "08:15:00", "17:40:00", "a.jpg"))
        .await
        .unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Created(_)), "{outcome:?}");
    let rows = pool.with_conn(|conn| activities_of_project(conn, project_id)).unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn create_then_widen_then_nothing_to_do() {
    let (pool, project_id, store) = store_with_project();

    let first = register(store.clone(), request("Joao Silva", "09:00:00", "12:00:00", "a.jpg"))
        .await
        .unwrap();
    let RegistrationOutcome::Created(id) = first else {
        panic!("expected a new activity, got {first:?}");
    };

    let second = register(store.clone(), request("Joao Silva", "08:15:00", "17:40:00", "b.jpg,a.jpg"))
        .await
        .unwrap();
    assert_eq!(second, RegistrationOutcome::Updated(id));

    // narrower interval and known files: already covered
    let third = register(store.clone(), request("Joao Silva", "10:00:00", "11:00:00", "b.jpg"))
        .await
        .unwrap();
    assert_eq!(third, RegistrationOutcome::Unchanged(id));

    let rows = pool.with_conn(|conn| activities_of_project(conn, project_id)).unwrap();
    assert_eq!(rows.len(), 1);
    let a = &rows[0];
    assert_eq!(a.description, "Attendance = Joao Silva");
    assert_eq!(a.owner, "Joao Silva");
    assert_eq!(a.people_count, Some(1));
    assert_eq!(a.start_time, Some(t(8, 15, 0)));
    assert_eq!(a.end_time, Some(t(17, 40, 0)));
    assert_eq!(a.attachments.serialized(), "a.jpg,b.jpg");
}

#[tokio::test]
async fn person_and_project_match_ignoring_case() {
    let (pool, project_id, store) = store_with_project();

    register(store.clone(), request("Joao Silva", "09:00:00", "12:00:00", "a.jpg"))
        .await
        .unwrap();

    let mut req = request("JOAO SILVA", "13:00:00", "14:00:00", "c.jpg");
    req.project = Some("obra12".into());
    let outcome = register(store.clone(), req).await.unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Updated(_)), "{outcome:?}");

    let rows = pool.with_conn(|conn| activities_of_project(conn, project_id)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].end_time, Some(t(14, 0, 0)));
}

#[tokio::test]
async fn different_people_get_their_own_activity() {
    let (pool, project_id, store) = store_with_project();

    register(store.clone(), request("Joao Silva", "09:00:00", "12:00:00", "a.jpg"))
        .await
        .unwrap();
    register(store.clone(), request("Ana", "09:00:00", "12:00:00", "b.jpg"))
        .await
        .unwrap();

    let rows = pool
        .with_conn(|conn| list_activities_for_project(conn, project_id))
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn plain_activity_accepts_both_date_formats() {
    let mut a = NewActivity {
        description: "Concrete pouring".into(),
        activity_date: "2024-03-05".into(),
        people_count: Some(4),
        start_time: Some("07:30".into()),
        end_time: Some("16:00:00".into()),
        owner: "Carla".into(),
        project_id: Some(1),
        attachments: vec!["plan.pdf".into(), "plan.pdf".into()],
    };
    let draft = validate_new_activity(&a).unwrap();
    assert_eq!(draft.activity_date.to_string(), "2024-03-05");
    assert_eq!(draft.start_time, Some(t(7, 30, 0)));
    assert_eq!(draft.attachments.len(), 1);

    a.activity_date = "05-03-2024".into();
    assert_eq!(validate_new_activity(&a).unwrap().activity_date, draft.activity_date);

    a.people_count = Some(-1);
    assert!(matches!(validate_new_activity(&a), Err(AppError::Validation(_))));
}
