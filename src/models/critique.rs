use serde::{Deserialize, Deserializer, Serialize};

/// One imported sewer-connection record with its optional critique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueRow {
    pub id: i64,

    #[serde(default)]
    pub id_critica: Option<i64>,

    /// Property registration number; the backend sends it as text or number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub matricula_imovel: Option<String>,

    #[serde(default)]
    pub sit_ligacao_esgoto: Option<String>,

    #[serde(default)]
    pub esgoto_tratado: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub data_vistoria: Option<String>,

    #[serde(default)]
    pub susp_cobranca_disponibilidade: Option<String>,

    #[serde(default)]
    pub mensagem_dossie: Option<String>,

    #[serde(default)]
    pub critica: Option<String>,
}

impl CritiqueRow {
    /// A row whose critique has any non-blank text cannot be processed.
    pub fn is_blocking(&self) -> bool {
        self.critica
            .as_deref()
            .is_some_and(|critica| !critica.trim().is_empty())
    }
}

/// Count of rows that carry a critique.
pub fn blocked_count(rows: &[CritiqueRow]) -> usize {
    rows.iter().filter(|row| row.is_blocking()).count()
}

/// PUT body for the batch process endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    #[serde(rename = "nomeArquivo")]
    pub file_name: String,

    #[serde(rename = "ligacaoEsgotoLoteDTO")]
    pub rows: Vec<CritiqueRow>,
}

/// PUT body for the property update endpoint: ids of rows without critique.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRequest {
    pub ids: Vec<i64>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
