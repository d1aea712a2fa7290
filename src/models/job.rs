use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::critique::CritiqueRow;

/// Processing state of the backend batch job, as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum JobState {
    #[strum(to_string = "idle", serialize = "pronto", serialize = "ocioso")]
    Idle,
    #[strum(to_string = "processing", serialize = "processando")]
    Processing,
    #[strum(
        to_string = "done",
        serialize = "processado",
        serialize = "concluido",
        serialize = "concluído"
    )]
    Done,
}

/// Status of the last batch job, validated at the client boundary.
///
/// `finished_at` is present if and only if `status` is [`JobState::Done`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobStatus {
    pub status: JobState,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub last_file_name: Option<String>,
}

impl BatchJobStatus {
    /// No batch has been submitted yet.
    pub fn idle() -> Self {
        Self {
            status: JobState::Idle,
            started_at: None,
            finished_at: None,
            last_file_name: None,
        }
    }

    pub fn new(
        status: JobState,
        started_at: Option<NaiveDateTime>,
        finished_at: Option<NaiveDateTime>,
        last_file_name: Option<String>,
    ) -> Result<Self, ContractError> {
        match (status, finished_at.is_some()) {
            (JobState::Done, false) => return Err(ContractError::DoneWithoutFinish),
            (JobState::Idle | JobState::Processing, true) => {
                return Err(ContractError::FinishWithoutDone(status))
            }
            _ => {}
        }

        Ok(Self {
            status,
            started_at,
            finished_at,
            last_file_name,
        })
    }

    pub fn is_processing(&self) -> bool {
        self.status == JobState::Processing
    }

    /// One-line summary shown next to the upload form.
    pub fn description(&self) -> String {
        let Some(started_at) = self.started_at else {
            return match self.status {
                JobState::Idle => "pronto".to_string(),
                other => other.to_string(),
            };
        };

        let mut text = format!("Envio: {}", started_at.format("%d/%m/%Y"));
        if let Some(finished_at) = self.finished_at {
            text.push_str(&format!(
                " - Término processamento: {}",
                finished_at.format("%d/%m/%Y")
            ));
        }
        if let Some(ref file) = self.last_file_name {
            text.push_str(" - ");
            text.push_str(file);
        }
        text.push_str(" - ");
        text.push_str(&self.status.to_string());
        text
    }
}

/// Status envelope returned by the backend status endpoints.
///
/// Every field is optional on the wire; an empty or `null` body decodes to the
/// default envelope, which means "no batch".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, rename = "dataHoraInicioProcesso")]
    pub started_at: Option<String>,

    #[serde(default, rename = "dataHoraFimProcesso")]
    pub finished_at: Option<String>,

    #[serde(default, rename = "ultimoArquivoExecutado")]
    pub last_file_name: Option<String>,

    #[serde(default, rename = "ligacaoEsgotoLote")]
    pub rows: Option<Vec<CritiqueRow>>,
}

impl StatusEnvelope {
    /// Validate the envelope into a [`BatchJobStatus`], dropping the rows.
    pub fn to_status(&self) -> Result<BatchJobStatus, ContractError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => JobState::Idle,
            Some(raw) => raw
                .parse::<JobState>()
                .map_err(|_| ContractError::UnknownStatus(raw.to_string()))?,
        };

        let started_at = parse_timestamp("dataHoraInicioProcesso", self.started_at.as_deref())?;
        let finished_at = parse_timestamp("dataHoraFimProcesso", self.finished_at.as_deref())?;
        let last_file_name = self
            .last_file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        BatchJobStatus::new(status, started_at, finished_at, last_file_name)
    }

    /// Validate the envelope and keep the imported rows alongside the status.
    pub fn into_snapshot(self) -> Result<BatchSnapshot, ContractError> {
        let status = self.to_status()?;
        Ok(BatchSnapshot {
            status,
            rows: self.rows.unwrap_or_default(),
        })
    }
}

/// Status plus the imported rows of the same response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSnapshot {
    pub status: BatchJobStatus,
    pub rows: Vec<CritiqueRow>,
}

/// Accepts RFC 3339, naive ISO date-times (`T` or space separated) and bare dates.
fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDateTime>, ContractError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.naive_local()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(parsed));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight));
    }

    Err(ContractError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    })
}

/// The backend answered with a body that breaks the status contract.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("unknown processing status '{0}'")]
    UnknownStatus(String),

    #[error("invalid timestamp in {field}: '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("status is done but no finish time was reported")]
    DoneWithoutFinish,

    #[error("finish time reported while status is {0}")]
    FinishWithoutDone(JobState),
}
