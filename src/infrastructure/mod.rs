pub mod config;
pub mod db;
pub mod enrichment;
pub mod feeds;
pub mod http;
pub mod repositories;
