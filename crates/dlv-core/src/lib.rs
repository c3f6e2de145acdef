pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod fetch;
pub mod gpg;
pub mod http;
pub mod report;
