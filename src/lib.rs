pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod grading;
pub mod init;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod report;
pub mod seed;
pub mod store;
pub mod tokenizer;
