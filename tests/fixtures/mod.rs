//! Backend payloads shared by the API tests

use serde_json::{json, Value};

pub const FILE_NAME: &str = "ligacoes_janeiro.xlsx";

/// Imported row without critique.
pub fn clean_row(id: i64) -> Value {
    json!({
        "id": id,
        "idCritica": null,
        "matriculaImovel": format!("{}", 100_000 + id),
        "sitLigacaoEsgoto": "LIGADO",
        "esgotoTratado": "S",
        "dataVistoria": "2020-01-10",
        "suspCobrancaDisponibilidade": "N",
        "mensagemDossie": null,
        "critica": null
    })
}

/// Imported row carrying a critique.
pub fn blocked_row(id: i64) -> Value {
    json!({
        "id": id,
        "idCritica": 3,
        "matriculaImovel": format!("{}", 200_000 + id),
        "sitLigacaoEsgoto": "LIGADO",
        "esgotoTratado": "N",
        "dataVistoria": "2020-01-11",
        "suspCobrancaDisponibilidade": "N",
        "mensagemDossie": "Imóvel não localizado",
        "critica": "Matrícula inexistente"
    })
}

pub fn processing_status() -> Value {
    json!({
        "status": "Processando",
        "dataHoraInicioProcesso": "2020-01-25T10:00:00",
        "dataHoraFimProcesso": null,
        "ultimoArquivoExecutado": FILE_NAME,
        "ligacaoEsgotoLote": []
    })
}

pub fn done_status(rows: Vec<Value>) -> Value {
    json!({
        "status": "Processado",
        "dataHoraInicioProcesso": "2020-01-25T10:00:00",
        "dataHoraFimProcesso": "2020-01-25T10:30:00",
        "ultimoArquivoExecutado": FILE_NAME,
        "ligacaoEsgotoLote": rows
    })
}

pub fn history() -> Value {
    json!([
        {
            "status": "Processado",
            "dataHoraInicioProcesso": "2020-01-20T08:00:00",
            "dataHoraFimProcesso": "2020-01-20T08:45:00",
            "ultimoArquivoExecutado": "ligacoes_dezembro.xlsx"
        },
        {
            "status": "Processando",
            "dataHoraInicioProcesso": "2020-01-25T10:00:00",
            "ultimoArquivoExecutado": FILE_NAME
        }
    ])
}
