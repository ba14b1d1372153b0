//! Route table synthesis for the edge engine

pub mod compiler;
pub mod matcher;
pub mod table;

/// Fixed path of the internal admin meta-route. Routes matching this path
/// sort ahead of every other path-bearing route.
pub const ADMIN_ROUTE_PATH: &str = "/_wharf";
