pub mod action_log;
pub mod hooks;
pub mod progress;
pub mod status_catalog;
pub mod transition_engine;
pub mod transition_table;
