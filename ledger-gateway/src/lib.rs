pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod query;
pub mod service;
pub mod status;
pub mod subscription;
pub mod tip;
pub mod tool;
pub mod types;

#[macro_use]
extern crate log;

pub use error::*;
pub use gateway::*;
pub use service::*;
pub use status::*;
