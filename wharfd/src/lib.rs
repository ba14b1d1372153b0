//! wharfd library
//!
//! Control plane for a self-hosted multi-tenant deployment host: accepts
//! declarative deployment records and continuously renders them into a
//! live routing configuration for an external edge-serving engine.

pub mod app;
pub mod authn;
pub mod bus;
pub mod edge;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod registry;
pub mod routes;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
