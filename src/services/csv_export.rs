use chrono::NaiveDateTime;

use crate::models::critique::CritiqueRow;
use crate::models::job::BatchJobStatus;

pub const CRITIQUE_REPORT_FILE: &str = "ligacaoValidacao_criticas.csv";
pub const RESULTS_REPORT_FILE: &str = "resultado_processamento_ligacao-esgoto.csv";

const CRITIQUE_COLUMNS: [&str; 9] = [
    "ID",
    "ID Crítica",
    "Matrícula Imóvel",
    "Situação de Ligação do Esgoto",
    "Esgoto Tratado",
    "Data de Vistoria",
    "Mensagem Dossiê",
    "Suspensão Cobrança",
    "Crítica",
];

const PROCESSING_COLUMNS: [&str; 4] = [
    "Data Fim Processo",
    "Data Inicio Processo",
    "Status",
    "Último Arquivo Executado",
];

/// Semicolon-separated report prefixed with the user/timestamp header line.
struct Report {
    writer: csv::Writer<Vec<u8>>,
}

impl Report {
    fn new(user: &str, generated_at: NaiveDateTime, columns: &[&str]) -> Result<Self, CsvError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        writer.write_record([
            format!("Usuário: {user}"),
            format!("Gerado em: {}", generated_at.format("%d/%m/%Y %H:%M")),
        ])?;
        writer.write_record(columns)?;
        Ok(Self { writer })
    }

    fn row<I, T>(&mut self, fields: I) -> Result<(), CsvError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(fields)?;
        Ok(())
    }

    fn finish(self) -> Result<String, CsvError> {
        let bytes = self
            .writer
            .into_inner()
            .map_err(|err| CsvError::Io(err.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Export of the critique table.
pub fn critique_report(
    user: &str,
    generated_at: NaiveDateTime,
    rows: &[CritiqueRow],
) -> Result<String, CsvError> {
    let mut report = Report::new(user, generated_at, &CRITIQUE_COLUMNS)?;
    for row in rows {
        report.row([
            row.id.to_string(),
            row.id_critica.map(|id| id.to_string()).unwrap_or_default(),
            text(&row.matricula_imovel),
            text(&row.sit_ligacao_esgoto),
            text(&row.esgoto_tratado),
            text(&row.data_vistoria),
            text(&row.mensagem_dossie),
            text(&row.susp_cobranca_disponibilidade),
            text(&row.critica),
        ])?;
    }
    report.finish()
}

/// Export of the processing history shown on the monitoring step.
pub fn processing_report(
    user: &str,
    generated_at: NaiveDateTime,
    records: &[BatchJobStatus],
) -> Result<String, CsvError> {
    let mut report = Report::new(user, generated_at, &PROCESSING_COLUMNS)?;
    for record in records {
        report.row([
            date(record.finished_at),
            date(record.started_at),
            record.status.to_string(),
            text(&record.last_file_name),
        ])?;
    }
    report.finish()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|at| at.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("CSV write error: {0}")]
    Write(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
