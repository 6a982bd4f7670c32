pub mod completions;
pub mod embed;
pub mod health;
pub mod init;
pub mod insert;
pub mod search;
pub mod stats;
