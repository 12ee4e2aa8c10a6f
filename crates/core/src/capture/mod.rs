pub mod capture_session;
pub mod output_namer;
pub mod shot;
pub mod status_messages;
