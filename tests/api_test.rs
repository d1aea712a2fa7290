//! Router-level tests against a mocked utility backend
//!
//! Each test mounts the expected backend calls on a wiremock server and drives
//! the router in-process with `tower::ServiceExt::oneshot`.

mod fixtures;
mod helpers;

use axum::http::{header, Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{blocked_row, clean_row, done_status, history, processing_status, FILE_NAME};
use helpers::{
    empty_post, get, json_request, multipart_upload, read_only, send, test_app, test_state,
    test_state_with, token, token_with, USER,
};
use sewer_batch_import::models::table::TableQueryState;
use sewer_batch_import::models::workflow::TableId;
use sewer_batch_import::services::permissions::{IMPORT_SCREEN, VALIDATION_SCREEN};
use sewer_batch_import::services::table_state::persist_table_state;
use sewer_batch_import::services::workflow::NavigationPolicy;

const BASE: &str = "/api/v1/ligacoes-esgoto";

async fn mock_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn forbid(server: &MockServer, verb: &str, route: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    mock_status(&server, json!({})).await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get("/health", &token())).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["backend"]["status"], "ok");
}

#[tokio::test]
async fn test_health_degraded_when_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get("/health", &token())).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json()["status"], "degraded");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = MockServer::start().await;
    let app = test_app(test_state(&server.uri()));

    let request = axum::http::Request::builder()
        .uri(format!("{BASE}/status"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body = response.json();
    assert_eq!(body["notification"]["severity"], "error");
    assert_eq!(body["notification"]["lifeMs"], 5000);
}

#[tokio::test]
async fn test_status_reports_processing() {
    let server = MockServer::start().await;
    mock_status(&server, processing_status()).await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get(&format!("{BASE}/status"), &token())).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "processing");
    assert_eq!(body["processing"], true);
    assert_eq!(body["lastFileName"], FILE_NAME);
    assert_eq!(
        body["description"],
        format!("Envio: 25/01/2020 - {FILE_NAME} - processing")
    );
}

#[tokio::test]
async fn test_empty_status_is_idle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let body = send(&app, get(&format!("{BASE}/status"), &token())).await.json();
    assert_eq!(body["status"], "idle");
    assert_eq!(body["description"], "pronto");
}

#[tokio::test]
async fn test_backend_error_message_reaches_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "tituloStatus": "Serviço indisponível"
        })))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get(&format!("{BASE}/status"), &token())).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.json()["notification"]["detail"], "Serviço indisponível");
}

#[tokio::test]
async fn test_upload_five_megabytes_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ligacaoEsgotoLote/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 4321 })))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let request = multipart_upload(
        &format!("{BASE}/arquivos"),
        &token(),
        &[(FILE_NAME, vec![7u8; 5_000_000])],
    );
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    let body = response.json();
    assert_eq!(body["uploadId"], "4321");
    assert_eq!(body["summary"]["fileCount"], 1);
    assert_eq!(body["summary"]["totalMb"], 5.0);
    assert_eq!(body["notification"]["severity"], "success");
}

#[tokio::test]
async fn test_upload_without_files_is_rejected_locally() {
    let server = MockServer::start().await;
    forbid(&server, "POST", "/ligacaoEsgotoLote/upload").await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, multipart_upload(&format!("{BASE}/arquivos"), &token(), &[])).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["notification"]["severity"], "warn");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_locally() {
    let server = MockServer::start().await;
    forbid(&server, "POST", "/ligacaoEsgotoLote/upload").await;
    let app = test_app(test_state_with(&server.uri(), 1_000, NavigationPolicy::Free));

    let request = multipart_upload(
        &format!("{BASE}/arquivos"),
        &token(),
        &[("a.xlsx", vec![0u8; 600]), ("b.xlsx", vec![0u8; 401])],
    );
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_read_only_user_upload_is_ignored() {
    let server = MockServer::start().await;
    forbid(&server, "POST", "/ligacaoEsgotoLote/upload").await;
    let app = test_app(test_state(&server.uri()));
    let token = token_with(USER, vec![read_only(IMPORT_SCREEN.transaction)]);

    let request = multipart_upload(&format!("{BASE}/arquivos"), &token, &[("a.xlsx", vec![1])]);
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_selection_summary() {
    let server = MockServer::start().await;
    let app = test_app(test_state(&server.uri()));

    let request = json_request(
        Method::POST,
        &format!("{BASE}/arquivos/resumo"),
        &token(),
        json!({ "sizes": [10_000_000, 20_000_001] }),
    );
    let body = send(&app, request).await.json();
    assert_eq!(body["fileCount"], 2);
    assert_eq!(body["limitBytes"], 30_000_000);
    assert_eq!(body["problem"], "The selected files exceed 30 MB");

    let request = json_request(
        Method::POST,
        &format!("{BASE}/arquivos/resumo"),
        &token(),
        json!({ "sizes": [] }),
    );
    let body = send(&app, request).await.json();
    assert_eq!(body["problem"], "Select at least one file to send");
}

#[tokio::test]
async fn test_confirm_is_noop_while_processing() {
    let server = MockServer::start().await;
    mock_status(&server, processing_status()).await;
    forbid(&server, "PUT", "/ligacaoEsgotoLote/processar").await;
    let app = test_app(test_state(&server.uri()));

    let request = json_request(
        Method::POST,
        &format!("{BASE}/confirmar"),
        &token(),
        json!({ "rows": [clean_row(1)] }),
    );
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_confirm_becomes_eligible_once_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(processing_status()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock_status(&server, done_status(vec![clean_row(1), blocked_row(2)])).await;
    Mock::given(method("PUT"))
        .and(path("/ligacaoEsgotoLote/processar"))
        .and(body_json(json!({
            "nomeArquivo": FILE_NAME,
            "ligacaoEsgotoLoteDTO": [clean_row(1), blocked_row(2)]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let first = send(&app, empty_post(&format!("{BASE}/confirmar"), &token())).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);

    let second = send(&app, empty_post(&format!("{BASE}/confirmar"), &token())).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["notification"]["severity"], "success");
}

#[tokio::test]
async fn test_confirm_with_every_row_blocked() {
    let server = MockServer::start().await;
    mock_status(&server, done_status(vec![blocked_row(1), blocked_row(2)])).await;
    forbid(&server, "PUT", "/ligacaoEsgotoLote/processar").await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, empty_post(&format!("{BASE}/confirmar"), &token())).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json()["notification"]["detail"],
        "Unable to proceed: every record has a critique"
    );
}

#[tokio::test]
async fn test_confirm_read_only_user_is_ignored() {
    let server = MockServer::start().await;
    mock_status(&server, done_status(vec![clean_row(1)])).await;
    forbid(&server, "PUT", "/ligacaoEsgotoLote/processar").await;
    let app = test_app(test_state(&server.uri()));
    let token = token_with(USER, vec![read_only(VALIDATION_SCREEN.transaction)]);

    let response = send(&app, empty_post(&format!("{BASE}/confirmar"), &token)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_confirm_failure_surfaces_backend_message() {
    let server = MockServer::start().await;
    mock_status(&server, done_status(vec![clean_row(1)])).await;
    Mock::given(method("PUT"))
        .and(path("/ligacaoEsgotoLote/processar"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "descricaoExcessao": "Lote em processamento por outro usuário"
        })))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, empty_post(&format!("{BASE}/confirmar"), &token())).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let body = response.json();
    assert_eq!(body["notification"]["severity"], "error");
    assert_eq!(
        body["notification"]["detail"],
        "Lote em processamento por outro usuário"
    );
}

#[tokio::test]
async fn test_confirm_without_rows_reports_refresh_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_status(vec![clean_row(1)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "descricaoExcessao": "Serviço indisponível"
        })))
        .mount(&server)
        .await;
    forbid(&server, "PUT", "/ligacaoEsgotoLote/processar").await;
    let app = test_app(test_state(&server.uri()));

    let status = send(&app, get(&format!("{BASE}/status"), &token())).await;
    assert_eq!(status.status, StatusCode::OK);

    let response = send(&app, empty_post(&format!("{BASE}/confirmar"), &token())).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let body = response.json();
    assert_eq!(body["notification"]["severity"], "error");
    assert_eq!(body["notification"]["detail"], "Serviço indisponível");
}

#[tokio::test]
async fn test_confirm_with_rows_uses_last_known_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_status(vec![clean_row(1)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/ligacaoEsgotoLote/processar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    send(&app, get(&format!("{BASE}/status"), &token())).await;

    let request = json_request(
        Method::POST,
        &format!("{BASE}/confirmar"),
        &token(),
        json!({ "rows": [clean_row(1)] }),
    );
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_confirm_selected_sends_clean_ids() {
    let server = MockServer::start().await;
    mock_status(&server, done_status(vec![clean_row(1), blocked_row(2), clean_row(3)])).await;
    Mock::given(method("PUT"))
        .and(path("/atualizacaoImovel/atualizar"))
        .and(body_json(json!({ "ids": [1, 3] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(
        &app,
        empty_post(&format!("{BASE}/confirmar-selecionados"), &token()),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_critique_table_state_is_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .and(query_param("page", "2"))
        .and(query_param("size", "20"))
        .and(query_param("sort", "matriculaImovel,ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_status(vec![blocked_row(41)])))
        .expect(1)
        .mount(&server)
        .await;
    mock_status(&server, done_status(vec![])).await;
    let app = test_app(test_state(&server.uri()));

    let response = send(
        &app,
        get(
            &format!("{BASE}/criticas?page=2&size=20&sortField=matriculaImovel&sortOrder=1"),
            &token(),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["table"]["page"], 2);
    assert_eq!(body["table"]["sortDirection"], "ASC");
    assert_eq!(body["blockedCount"], 1);

    // Page and size come back on the next mount; sorting is not persisted.
    let screen = send(&app, get(&format!("{BASE}/validacao"), &token())).await.json();
    assert_eq!(screen["critiques"]["table"]["page"], 2);
    assert_eq!(screen["critiques"]["table"]["pageSize"], 20);
}

#[tokio::test]
async fn test_invalid_table_query() {
    let server = MockServer::start().await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get(&format!("{BASE}/criticas?size=0"), &token())).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_screen_survives_partial_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_status(vec![clean_row(1)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let screen = send(&app, get(&format!("{BASE}/validacao"), &token())).await.json();
    assert_eq!(screen["errors"].as_array().unwrap().len(), 1);
    assert_eq!(screen["critiques"]["rows"].as_array().unwrap().len(), 1);
    assert!(screen["status"].is_null());
    assert_eq!(screen["canConfirm"], false);
}

#[tokio::test]
async fn test_validation_screen_offers_confirmation() {
    let server = MockServer::start().await;
    mock_status(&server, done_status(vec![clean_row(1), blocked_row(2)])).await;
    let app = test_app(test_state(&server.uri()));

    let screen = send(&app, get(&format!("{BASE}/validacao"), &token())).await.json();
    assert!(screen["errors"].as_array().unwrap().is_empty());
    assert_eq!(screen["status"]["status"], "done");
    assert_eq!(screen["critiques"]["blockedCount"], 1);
    assert_eq!(screen["canConfirm"], true);
    assert_eq!(screen["permissions"]["components"][0]["disabled"], false);
}

#[tokio::test]
async fn test_critique_csv_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status"))
        .and(query_param("size", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_status(vec![blocked_row(5)])))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get(&format!("{BASE}/criticas/csv"), &token())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert!(response.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("ligacaoValidacao_criticas.csv"));

    let text = response.text();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("Usuário: u123;Gerado em: "));
    assert!(lines[1].starts_with("ID;ID Crítica;"));
    assert!(lines[2].starts_with("5;3;200005;"));
}

#[tokio::test]
async fn test_navigation_reloads_step_tables() {
    let server = MockServer::start().await;
    let app = test_app(test_state(&server.uri()));

    let response = send(
        &app,
        json_request(Method::PUT, &format!("{BASE}/etapa"), &token(), json!({ "step": "monitor" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["from"], "import");
    assert_eq!(body["to"], "monitor");
    assert_eq!(body["tables"].as_array().unwrap().len(), 2);
    assert_eq!(body["tables"][0]["state"]["sortField"], "matriculaImovel");
    assert_eq!(body["tables"][0]["state"]["sortDirection"], "DESC");

    let step = send(&app, get(&format!("{BASE}/etapa"), &token())).await.json();
    assert_eq!(step["step"], "monitor");
    assert_eq!(step["policy"], "free");
}

#[tokio::test]
async fn test_gated_navigation_blocks_monitoring_while_processing() {
    let server = MockServer::start().await;
    mock_status(&server, processing_status()).await;
    let app = test_app(test_state_with(
        &server.uri(),
        30_000_000,
        NavigationPolicy::Gated,
    ));

    send(&app, get(&format!("{BASE}/status"), &token())).await;
    let response = send(
        &app,
        json_request(Method::PUT, &format!("{BASE}/etapa"), &token(), json!({ "step": "monitor" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["notification"]["severity"], "warn");
}

#[tokio::test]
async fn test_monitoring_screen() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status/processar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history()))
        .expect(2)
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let screen = send(&app, get(&format!("{BASE}/acompanhamento"), &token())).await.json();
    assert_eq!(screen["monitoring"]["records"].as_array().unwrap().len(), 2);
    assert_eq!(screen["results"]["records"].as_array().unwrap().len(), 1);
    assert_eq!(
        screen["results"]["records"][0]["lastFileName"],
        "ligacoes_dezembro.xlsx"
    );
}

#[tokio::test]
async fn test_results_table_pages_over_finished_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status/processar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
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
            },
            {
                "status": "Processado",
                "dataHoraInicioProcesso": "2019-12-20T08:00:00",
                "dataHoraFimProcesso": "2019-12-20T09:00:00",
                "ultimoArquivoExecutado": "ligacoes_novembro.xlsx"
            }
        ])))
        .mount(&server)
        .await;
    let state = test_state(&server.uri());
    let second_page = TableQueryState {
        page: 1,
        page_size: 1,
        ..Default::default()
    };
    persist_table_state(state.table_store.as_ref(), USER, TableId::RESULTS, &second_page)
        .await
        .unwrap();
    let app = test_app(state);

    let screen = send(&app, get(&format!("{BASE}/acompanhamento"), &token())).await.json();
    let results = &screen["results"];
    assert_eq!(results["total"], 2);
    assert_eq!(results["records"].as_array().unwrap().len(), 1);
    assert_eq!(results["records"][0]["lastFileName"], "ligacoes_novembro.xlsx");
    assert!(screen["monitoring"].get("total").is_none());
}

#[tokio::test]
async fn test_results_csv_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ligacaoEsgotoLote/status/processar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history()))
        .mount(&server)
        .await;
    let app = test_app(test_state(&server.uri()));

    let response = send(&app, get(&format!("{BASE}/resultados/csv"), &token())).await;
    assert_eq!(response.status, StatusCode::OK);
    let text = response.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "20/01/2020;20/01/2020;done;ligacoes_dezembro.xlsx");
}

#[tokio::test]
async fn test_screen_permissions() {
    let server = MockServer::start().await;
    let app = test_app(test_state(&server.uri()));
    let token = token_with(USER, vec![read_only(VALIDATION_SCREEN.transaction)]);

    let response = send(&app, get("/api/v1/permissoes/validacao", &token)).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["level"], 1);
    assert_eq!(body["components"][0]["id"], "botaoConfirmar");
    assert_eq!(body["components"][0]["disabled"], true);

    let response = send(&app, get("/api/v1/permissoes/arrecadacao", &token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
