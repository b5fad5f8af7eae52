use super::attachments::AttachmentList;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Row of `activity_logs`.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub id: i64,
    pub description: String,
    pub activity_date: NaiveDate,
    pub people_count: Option<i64>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub owner: String,
    pub project_id: Option<i64>,
    pub attachments: AttachmentList,
    pub created_at: String,
}

/// Payload of `POST /api/activities` (plain activity, no attendance link).
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    #[serde(alias = "QualAtividade")]
    pub description: String,
    /// YYYY-MM-DD
    #[serde(alias = "DataDaAtividade")]
    pub activity_date: String,
    #[serde(default, alias = "QuantasPessoas")]
    pub people_count: Option<i64>,
    #[serde(default, alias = "HoraInicial")]
    pub start_time: Option<String>,
    #[serde(default, alias = "HoraFinal")]
    pub end_time: Option<String>,
    #[serde(alias = "Responsavel")]
    pub owner: String,
    #[serde(default, alias = "ProjetoID")]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Payload of `POST /api/activities/register`, as sent by the attendance UI.
///
/// Every field is optional at the wire level so that a missing field is a
/// validation error (400) rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterActivityRequest {
    #[serde(default, alias = "Nome")]
    pub person: Option<String>,
    /// DD-MM-YYYY
    #[serde(default, alias = "Data")]
    pub date: Option<String>,
    #[serde(default, alias = "horaInicial")]
    pub start_time: Option<String>,
    #[serde(default, alias = "horaFinal")]
    pub end_time: Option<String>,
    #[serde(default, alias = "Projeto")]
    pub project: Option<String>,
    /// Comma-separated attachment names.
    #[serde(default, alias = "Anexo")]
    pub attachments: Option<String>,
    #[serde(default, alias = "ProjetoValido")]
    pub project_valid: Option<bool>,
}

/// A registration request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRegistration {
    pub person: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub project: String,
    pub attachments: AttachmentList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "id", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Created(i64),
    Updated(i64),
    Unchanged(i64),
}

/// Validated fields of an activity row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDraft {
    pub description: String,
    pub activity_date: NaiveDate,
    pub people_count: Option<i64>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub owner: String,
    pub project_id: Option<i64>,
    pub attachments: AttachmentList,
}
