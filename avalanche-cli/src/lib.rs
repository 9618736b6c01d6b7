pub mod app;
pub mod artifacts;
pub mod aws;
pub mod config;
pub mod constants;
pub mod inventory;
pub mod jsonrpc;
pub mod models;
pub mod netrunner;
pub mod node;
pub mod subnet;
