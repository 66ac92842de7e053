pub mod control_listener;
pub mod file_event_log;
