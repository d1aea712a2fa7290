pub mod critique;
pub mod job;
pub mod notification;
pub mod permission;
pub mod table;
pub mod workflow;
