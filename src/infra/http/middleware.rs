use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::cache::MutationKind;
use crate::domain::error::EntityLevel;

const API_PREFIX: &str = "/api/v1/";

/// Which part of the catalog a request addresses and what it does to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOp {
    pub scope: &'static str,
    pub action: &'static str,
}

impl CatalogOp {
    pub fn classify(method: &Method, path: &str) -> Self {
        let scope = if path == "/health" {
            "health"
        } else if let Some(rest) = path.strip_prefix(API_PREFIX) {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            match segments.as_slice() {
                ["menus_whole"] => "whole_tree",
                ["menus", _, "submenus", _, "dishes", _, "discount"] => "discount",
                ["menus", ..] => level_for(&segments).as_str(),
                _ => "other",
            }
        } else {
            "other"
        };

        let action = if method == Method::POST {
            MutationKind::Create.as_str()
        } else if method == Method::PATCH || method == Method::PUT {
            MutationKind::Update.as_str()
        } else if method == Method::DELETE {
            MutationKind::Delete.as_str()
        } else {
            "read"
        };

        Self { scope, action }
    }
}

/// Deepest collection named in a `menus/...` path.
fn level_for(segments: &[&str]) -> EntityLevel {
    match segments {
        ["menus", _, "submenus", _, "dishes", ..] => EntityLevel::Dish,
        ["menus", _, "submenus", ..] => EntityLevel::Submenu,
        _ => EntityLevel::Menu,
    }
}

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub op: CatalogOp,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        op: CatalogOp::classify(request.method(), request.uri().path()),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// One debug line per request; failures are raised to warn/error with the
/// attached [`ErrorReport`] when present.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let (request_id, op) = match request.extensions().get::<RequestContext>() {
        Some(ctx) => (ctx.request_id.clone(), ctx.op),
        None => (String::new(), CatalogOp::classify(&method, &path)),
    };

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target = "menu_cache::http::response",
            status = status.as_u16(),
            scope = op.scope,
            action = op.action,
            path = %path,
            elapsed_ms,
            request_id,
            "catalog request served",
        );
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = "menu_cache::http::response",
            status = status.as_u16(),
            scope = op.scope,
            action = op.action,
            path = %path,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id,
            "catalog request failed",
        );
    } else {
        warn!(
            target = "menu_cache::http::response",
            status = status.as_u16(),
            scope = op.scope,
            action = op.action,
            path = %path,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id,
            "catalog request rejected",
        );
    }

    response
}
