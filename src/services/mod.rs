pub mod backend;
pub mod csv_export;
pub mod dispatcher;
pub mod loading;
pub mod permissions;
pub mod poller;
pub mod sessions;
pub mod submitter;
pub mod table_state;
pub mod validation;
pub mod workflow;
