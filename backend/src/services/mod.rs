pub mod session_store;
pub mod session_sweeper;
