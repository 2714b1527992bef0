// Library interface for tubedigest modules
// This allows tests and the helper binaries to import modules

pub mod auth;
pub mod client;
pub mod error;
pub mod llm;
pub mod server;
pub mod service;
pub mod storage;
pub mod video;
