//! Route table wire types

use serde::{Deserialize, Serialize};

use crate::routes::matcher::RouteMatcher;

/// HTTP status used for redirect routes. Permanent so non-GET methods
/// survive the redirect.
pub const REDIRECT_STATUS: u16 = 308;

/// An ordered matcher→handler-chain table. Ordering is semantically
/// significant: the edge engine evaluates first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<Route>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// One matcher→handler-chain binding. `matcher: None` is a catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<RouteMatcher>,

    pub handlers: Vec<RouteHandler>,
}

/// Handler steps understood by the edge engine, applied in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteHandler {
    /// Remove the deployment's path prefix before the content sees the request
    StripPrefix { prefix: String },

    /// Rewrite requests that resolve to no file to a single fallback document
    SpaRewrite { fallback: String },

    /// Serve from a content root, negotiating compression. Encodings are
    /// listed by preference; higher-ratio codecs come first.
    FileServer {
        root: String,
        encodings: Vec<String>,
    },

    /// Proxy to an upstream, forwarding the original Host header and the
    /// caller's address
    ReverseProxy {
        upstream: String,
        preserve_host: bool,
        forward_client_ip: bool,
    },

    /// Issue an HTTP redirect
    Redirect { target: String, status: u16 },

    /// Fixed response, used for placeholder routes
    StaticResponse { status: u16, body: String },
}
