pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod console;
pub mod email;
pub mod error;
pub mod format;
pub mod inbox;
pub mod services;
pub mod types;

#[cfg(test)]
mod testing;
