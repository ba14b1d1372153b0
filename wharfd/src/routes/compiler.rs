//! Pure compiler from deployment records to the edge route table.
//!
//! Stateless and side-effect free: the bus calls this on every mutation
//! and pushes the result to the edge engine.

use std::cmp::Ordering;

use tracing::warn;

use crate::errors::ControlError;
use crate::models::deployment::{Deployment, ServedThingType};
use crate::routes::matcher::RouteMatcher;
use crate::routes::table::{Route, RouteHandler, RouteTable, REDIRECT_STATUS};
use crate::routes::ADMIN_ROUTE_PATH;

/// Body served for deployments that reserve a URL but have no content yet.
/// Serving something immediately lets the edge engine provision TLS for
/// the host before the first content upload.
const PLACEHOLDER_BODY: &str = "This site is reserved but not yet deployed.\n";

/// Fallback document for SPA-mode static sites
const SPA_FALLBACK: &str = "/index.html";

/// Compile the full deployment set into a priority-ordered route table
pub fn compile(deployments: &[Deployment]) -> Result<RouteTable, ControlError> {
    let mut routes = Vec::with_capacity(deployments.len());

    for deployment in deployments {
        match synthesize(deployment)? {
            Some(route) => routes.push(route),
            None => {
                warn!(
                    "Skipping deployment {} with unrecognized served-thing type",
                    deployment.url()
                );
            }
        }
    }

    // Stable: ties keep insertion order so recompilation never reshuffles
    // equally specific routes.
    routes.sort_by(specificity);

    Ok(RouteTable { routes })
}

/// Build the route for one deployment, or `None` if its type is unknown
fn synthesize(deployment: &Deployment) -> Result<Option<Route>, ControlError> {
    // End-user deployments must carry a fully qualified domain; internal
    // meta-routes are exempt.
    let require_fqdn = !deployment.metadata.dont_persist;
    let matcher = RouteMatcher::from_url(deployment.url(), require_fqdn)?;

    let content = match &deployment.content {
        Some(content) if content.has_content => content,
        _ => {
            return Ok(Some(Route {
                matcher,
                handlers: vec![RouteHandler::StaticResponse {
                    status: 200,
                    body: PLACEHOLDER_BODY.to_string(),
                }],
            }));
        }
    };

    let mut handlers = Vec::new();

    let strip = !deployment.url().path.is_empty() && !deployment.metadata.preserve_external_path;

    let tail: Vec<RouteHandler> = match content.served_thing_type {
        ServedThingType::StaticFiles => {
            let mut chain = Vec::new();
            if content.spa_mode {
                chain.push(RouteHandler::SpaRewrite {
                    fallback: SPA_FALLBACK.to_string(),
                });
            }
            chain.push(RouteHandler::FileServer {
                root: content.served_thing.clone(),
                encodings: vec!["zstd".to_string(), "gzip".to_string()],
            });
            chain
        }
        ServedThingType::DockerContainer | ServedThingType::ReverseProxy => {
            vec![RouteHandler::ReverseProxy {
                upstream: content.served_thing.clone(),
                preserve_host: true,
                forward_client_ip: true,
            }]
        }
        ServedThingType::Redirect => {
            vec![RouteHandler::Redirect {
                target: content.served_thing.clone(),
                status: REDIRECT_STATUS,
            }]
        }
        ServedThingType::Unknown => return Ok(None),
    };

    // Prefix stripping applies to routed content, not to redirects
    if strip && content.served_thing_type != ServedThingType::Redirect {
        handlers.push(RouteHandler::StripPrefix {
            prefix: deployment.url().path.clone(),
        });
    }
    handlers.extend(tail);

    Ok(Some(Route { matcher, handlers }))
}

/// Total specificity order: more specific routes sort first so the edge
/// engine evaluates them first.
///
/// 1. Matcher-less catch-alls first.
/// 2. The admin meta-route first among path-bearing routes (fixed-path
///    sentinel, a known special case).
/// 3. A path-bearing route before a host-only route.
/// 4. Between path-bearing routes, the longer path prefix first.
/// 5. Host-only routes are equal among themselves.
fn specificity(a: &Route, b: &Route) -> Ordering {
    let (ma, mb) = match (&a.matcher, &b.matcher) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(ma), Some(mb)) => (ma, mb),
    };

    let pa = ma.path_prefix();
    let pb = mb.path_prefix();

    match (pa == Some(ADMIN_ROUTE_PATH), pb == Some(ADMIN_ROUTE_PATH)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    match (pa, pb) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        // Longer prefix = more specific. A heuristic: equal-length
        // distinct paths stay in insertion order.
        (Some(x), Some(y)) => y.len().cmp(&x.len()),
    }
}
