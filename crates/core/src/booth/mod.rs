pub mod coordinator;
pub mod event_loop;
