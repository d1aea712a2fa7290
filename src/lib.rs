//! Sewer-connection batch import service
//!
//! Backend-for-frontend of the municipal utility back office for the
//! sewer-connection spreadsheet workflow: upload a batch, follow the backend
//! job status, review critiques and confirm the rows for processing.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
