pub mod approve;
pub mod config;
pub mod doctor;
pub mod ingest;
pub mod run;
