pub mod bridge_adapter;
pub mod config;
pub mod console;
pub mod join;
