pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod poller;
pub mod publish;
pub mod stats;
pub mod types;
pub mod window;
