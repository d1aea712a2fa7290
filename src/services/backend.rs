use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::critique::{ProcessRequest, UpdateRequest};
use crate::models::job::{ContractError, StatusEnvelope};
use crate::models::table::TableQueryState;

const STATUS_PATH: &str = "/ligacaoEsgotoLote/status";
const PROCESSING_STATUS_PATH: &str = "/ligacaoEsgotoLote/status/processar";
const UPLOAD_PATH: &str = "/ligacaoEsgotoLote/upload";
const PROCESS_PATH: &str = "/ligacaoEsgotoLote/processar";
const PROPERTY_UPDATE_PATH: &str = "/atualizacaoImovel/atualizar";

const EXCEL_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file selected for upload. `size` is the size the caller reports.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub size: u64,
}

impl BatchFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            bytes,
            size,
        }
    }
}

/// Identifier the backend assigned to an accepted upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub upload_id: Option<String>,
}

/// Error envelope of the utility backend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendErrorBody {
    #[serde(default)]
    descricao_excessao: Option<String>,
    #[serde(default)]
    titulo_status: Option<String>,
}

/// HTTP client for the utility backend's sewer-connection batch endpoints.
pub struct BackendClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sewer-batch-import/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET the status of the last batch, with its imported rows.
    pub async fn fetch_status(&self) -> Result<StatusEnvelope, BackendError> {
        let response = self.request(reqwest::Method::GET, STATUS_PATH).send().await?;
        read_json_or_default(check(response).await?).await
    }

    /// GET one page of the status envelope's rows.
    pub async fn fetch_status_page(
        &self,
        query: &TableQueryState,
    ) -> Result<StatusEnvelope, BackendError> {
        let response = self
            .request(reqwest::Method::GET, STATUS_PATH)
            .query(&query.query_params())
            .send()
            .await?;
        read_json_or_default(check(response).await?).await
    }

    /// GET the processing history, optionally paged.
    pub async fn fetch_processing_history(
        &self,
        query: Option<&TableQueryState>,
    ) -> Result<Vec<StatusEnvelope>, BackendError> {
        let mut request = self.request(reqwest::Method::GET, PROCESSING_STATUS_PATH);
        if let Some(query) = query {
            request = request.query(&query.query_params());
        }
        let response = request.send().await?;
        read_json_or_default(check(response).await?).await
    }

    /// POST the selected spreadsheets as one multipart request.
    pub async fn upload_batch(&self, files: Vec<BatchFile>) -> Result<UploadReceipt, BackendError> {
        let mut form = Form::new();
        for file in files {
            let mime = if file.name.to_ascii_lowercase().ends_with(".xlsx") {
                EXCEL_MIME
            } else {
                "application/octet-stream"
            };
            let part = Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(mime)?;
            form = form.part("files", part);
        }

        let response = self
            .request(reqwest::Method::POST, UPLOAD_PATH)
            .multipart(form)
            .send()
            .await?;
        let body = check(response).await?.text().await?;

        Ok(UploadReceipt {
            upload_id: upload_id_from_body(&body),
        })
    }

    /// PUT the batch rows for processing.
    pub async fn process_batch(&self, request: &ProcessRequest) -> Result<(), BackendError> {
        let response = self
            .request(reqwest::Method::PUT, PROCESS_PATH)
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// PUT the ids of rows without critique for property update.
    pub async fn update_properties(&self, request: &UpdateRequest) -> Result<(), BackendError> {
        let response = self
            .request(reqwest::Method::PUT, PROPERTY_UPDATE_PATH)
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Check backend reachability (for health checks).
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let response = self.request(reqwest::Method::GET, STATUS_PATH).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`BackendError::Backend`] with the server message.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: BackendErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
        .descricao_excessao
        .filter(|m| !m.trim().is_empty())
        .or(parsed.titulo_status.filter(|m| !m.trim().is_empty()));

    warn!(status = status.as_u16(), message = ?message, "Backend request failed");

    Err(BackendError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn read_json_or_default<T>(response: Response) -> Result<T, BackendError>
where
    T: DeserializeOwned + Default,
{
    let body = response.text().await?;
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        debug!("Backend returned an empty body");
        return Ok(T::default());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// The upload endpoint echoes an identifier either as JSON (`id`) or plain text.
fn upload_id_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => map.get("id").and_then(|id| match id {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Number(number) => Some(number.to_string()),
            _ => None,
        }),
        Ok(serde_json::Value::String(text)) => Some(text),
        Ok(serde_json::Value::Number(number)) => Some(number.to_string()),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Network error talking to the backend: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned status {status}")]
    Backend { status: u16, message: Option<String> },

    #[error("Unexpected backend response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend response violates the status contract: {0}")]
    Contract(#[from] ContractError),
}

impl BackendError {
    /// Message supplied by the backend, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Backend {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}
