use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row of `projects`.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub owner: String,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<i64>,
    pub layout: Option<String>,
    pub status: Option<String>,
    pub observation: Option<String>,
    pub created_at: String,
}

/// Payload of `POST /api/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    #[serde(alias = "NomeProjeto")]
    pub name: String,
    #[serde(default, alias = "Empresa")]
    pub company: String,
    #[serde(default, alias = "Responsavel")]
    pub owner: String,
    /// YYYY-MM-DD
    #[serde(default, alias = "Prazo")]
    pub deadline: Option<String>,
    /// Free text such as "120h"; only the digits are kept.
    #[serde(default, alias = "EstimativaHoras")]
    pub estimated_hours: Option<String>,
    #[serde(default, alias = "Layout")]
    pub layout: Option<String>,
}

/// Payload of `PUT /api/projects/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectStatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "observacao")]
    pub observation: Option<String>,
}
