use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rphotopunch::config::Config;
use rphotopunch::db::DbPool;
use rphotopunch::server::{AppState, build_router};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

mod common;
use common::touch;

struct Api {
    dir: TempDir,
    pool: DbPool,
    router: Router,
}

impl Api {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let watch = dir.path().join("photos");
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(&watch).unwrap();
        fs::create_dir_all(&uploads).unwrap();

        let config = Config {
            database: ":memory:".into(),
            watch_dir: watch.to_string_lossy().to_string(),
            uploads_dir: uploads.to_string_lossy().to_string(),
            public_base_url: "http://test.local/".into(),
            ..Config::default()
        };
        let pool = DbPool::in_memory().unwrap();
        let router = build_router(AppState::new(pool.clone(), config));
        Self { dir, pool, router }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let ctype = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body, ctype)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body, _) = self.send(req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body, _) = self.send(req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn add_project(&self, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/projects",
                json!({ "NomeProjeto": name, "Empresa": "ACME", "Responsavel": "Carla", "EstimativaHoras": "120h" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    fn activity_rows(&self) -> i64 {
        self.pool
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM activity_logs", [], |r| r.get(0))?)
            })
            .unwrap()
    }

    fn photo(&self, name: &str) {
        touch(&self.dir.path().join("photos"), name);
    }
}

fn registration(person: &str, start: &str, end: &str) -> Value {
    json!({
        "Nome": person,
        "Data": "05-03-2024",
        "horaInicial": start,
        "horaFinal": end,
        "Projeto": "Obra12",
        "Anexo": "a.jpg,b.jpg",
        "ProjetoValido": true,
    })
}

#[tokio::test]
async fn health_answers() {
    let api = Api::new();
    let (status, body) = api.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn projects_are_created_and_listed() {
    let api = Api::new();

    let (status, body) = api.get("/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let id = api.add_project("Obra12").await;
    let (status, body) = api.get("/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id);
    assert_eq!(body[0]["name"], "Obra12");
    assert_eq!(body[0]["estimated_hours"], 120);
}

#[tokio::test]
async fn project_without_name_is_a_bad_request() {
    let api = Api::new();
    let (status, body) = api.post("/api/projects", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn project_status_and_observation() {
    let api = Api::new();
    let id = api.add_project("Obra12").await;

    let req = Request::put(format!("/api/projects/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": "paused", "observacao": "rain" }).to_string()))
        .unwrap();
    let (status, _, _) = api.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = api.get(&format!("/api/projects/{id}/observation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paused");
    assert_eq!(body["observation"], "rain");

    let (status, _) = api.get("/api/projects/999/observation").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rescan_then_list_attendance() {
    let api = Api::new();
    api.add_project("obra12").await;
    api.photo("Joao_Silva_Obra12_2024.03.05.08.15.00.jpg");
    api.photo("Joao_Silva_Obra12_2024.03.05.17.40.00.jpg");
    api.photo("Ana_Galpao_2024.03.05.07.00.00.jpg");
    api.photo("readme.txt");

    let (status, report) = api.post("/api/attendance/rescan", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 4);
    assert_eq!(report["created"], 2);
    assert_eq!(report["updated"], 1);
    assert_eq!(report["rejected"], 1);

    let (status, body) = api.get("/api/attendance").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let joao = rows.iter().find(|r| r["person"] == "Joao Silva").unwrap();
    assert_eq!(joao["date"], "05-03-2024");
    assert_eq!(joao["start_time"], "08:15:00");
    assert_eq!(joao["end_time"], "17:40:00");
    assert_eq!(joao["project_valid"], true);
    assert_eq!(joao["attachments"].as_array().unwrap().len(), 2);

    let ana = rows.iter().find(|r| r["person"] == "Ana").unwrap();
    assert_eq!(ana["project_valid"], false);
}

#[tokio::test]
async fn non_ascii_project_flag_matches_registration() {
    let api = Api::new();
    api.add_project("ObraSÃO").await;
    api.photo("Joao_Silva_OBRASÃO_2024.03.05.08.15.00.jpg");
    api.photo("Ana_obrasão_2024.03.05.07.00.00.jpg");

    let (status, report) = api.post("/api/attendance/rescan", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["created"], 2);

    let (_, rows) = api.get("/api/attendance").await;
    for row in rows.as_array().unwrap() {
        let mut req = registration(row["person"].as_str().unwrap(), "08:00:00", "12:00:00");
        req["Projeto"] = row["project"].clone();
        let (status, body) = api.post("/api/activities/register", req).await;

        // the flag promises exactly what registration accepts
        if row["project_valid"] == true {
            assert_eq!(status, StatusCode::CREATED, "{row} {body}");
        } else {
            assert_eq!(body["error"], "project_not_found", "{row} {body}");
        }
    }

    let joao = rows.as_array().unwrap().iter().find(|r| r["person"] == "Joao Silva").unwrap();
    assert_eq!(joao["project_valid"], true);
    let ana = rows.as_array().unwrap().iter().find(|r| r["person"] == "Ana").unwrap();
    assert_eq!(ana["project_valid"], false);
    assert_eq!(api.activity_rows(), 1);
}

#[tokio::test]
async fn register_creates_then_updates() {
    let api = Api::new();
    let project_id = api.add_project("Obra12").await;

    let (status, body) = api
        .post("/api/activities/register", registration("Joao Silva", "09:00:00", "12:00:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["result"], "created");
    let activity_id = body["id"].as_i64().unwrap();

    let (status, body) = api
        .post("/api/activities/register", registration("Joao Silva", "08:00:00", "12:00:00"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "updated");
    assert_eq!(body["id"], activity_id);

    let (status, body) = api.get(&format!("/api/activities/project/{project_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["start_time"], "08:00:00");
    assert_eq!(
        list[0]["file_urls"][0],
        "http://test.local/files/uploads/activities/2024/03/05/a.jpg"
    );
}

#[tokio::test]
async fn register_refuses_bad_requests() {
    let api = Api::new();
    api.add_project("Obra12").await;

    let mut invalid = registration("Joao Silva", "09:00:00", "12:00:00");
    invalid["ProjetoValido"] = json!(false);
    let (status, body) = api.post("/api/activities/register", invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(api.activity_rows(), 0);

    let mut unknown = registration("Joao Silva", "09:00:00", "12:00:00");
    unknown["Projeto"] = json!("Nowhere");
    let (status, body) = api.post("/api/activities/register", unknown).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "project_not_found");
    assert_eq!(api.activity_rows(), 0);
}

#[tokio::test]
async fn no_activities_is_not_found() {
    let api = Api::new();
    let (status, body) = api.get("/api/activities/project/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn plain_activity_and_its_attachments() {
    let api = Api::new();
    let (status, body) = api
        .post(
            "/api/activities",
            json!({
                "QualAtividade": "Site survey",
                "DataDaAtividade": "2024-03-05",
                "Responsavel": "Carla",
                "attachments": ["plan.pdf"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = api.get(&format!("/api/activities/{id}/attachments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attachments"][0]["name"], "plan.pdf");
    assert_eq!(
        body["attachments"][0]["url"],
        "http://test.local/files/uploads/activities/2024/03/05/plan.pdf"
    );

    let (status, _) = api.get("/api/activities/999/attachments").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn project_report_is_a_pdf() {
    let api = Api::new();
    let id = api.add_project("Obra12").await;
    api.post("/api/activities/register", registration("Joao Silva", "09:00:00", "12:00:00"))
        .await;

    let req = Request::get(format!("/api/reports/projects/{id}/pdf"))
        .body(Body::empty())
        .unwrap();
    let (status, body, ctype) = api.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/pdf"));
    assert!(body.starts_with(b"%PDF"));

    let (status, _) = api.get("/api/reports/projects/999/pdf").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn files_are_served_with_their_content_type() {
    let api = Api::new();
    api.photo("Joao_Silva_Obra12_2024.03.05.08.15.00.jpg");

    let drawings = api.dir.path().join("uploads/activities/2024/03/05");
    fs::create_dir_all(&drawings).unwrap();
    fs::write(drawings.join("plan.dwg"), b"AC1032").unwrap();

    let req = Request::get("/files/photos/Joao_Silva_Obra12_2024.03.05.08.15.00.jpg")
        .body(Body::empty())
        .unwrap();
    let (status, _, ctype) = api.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("image/jpeg"));

    let req = Request::get("/files/uploads/activities/2024/03/05/plan.dwg")
        .body(Body::empty())
        .unwrap();
    let (status, body, ctype) = api.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/vnd.dwg"));
    assert_eq!(body, b"AC1032");

    let (status, _) = api.get("/files/photos/missing.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn files_outside_the_roots_are_refused() {
    let api = Api::new();
    fs::write(api.dir.path().join("secret.txt"), b"nope").unwrap();

    let (status, _) = api.get("/files/photos/..%2Fsecret.txt").await;
    assert_ne!(status, StatusCode::OK);

    let (status, _) = api.get("/files/photos/../secret.txt").await;
    assert_ne!(status, StatusCode::OK);
}
