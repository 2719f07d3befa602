//! IPC module for engine-shell communication

mod protocol;
mod server;

pub use server::Server;
