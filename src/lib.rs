pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod request;
