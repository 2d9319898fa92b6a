//! Per-client-IP admission gate.
//!
//! When enabled, every non-OPTIONS request from a client that has not
//! been approved is answered with 401 and the host is notified so a
//! human can approve out-of-band. Approval state lives for the server
//! process lifetime only and is matched by exact IP string.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Attempt recorded, host notified, waiting for a decision
    Pending,
    Approved,
    Rejected,
}

/// Concurrency-safe approval set plus the fire-and-forget notification
/// channel toward the host integration (UI, console, notification system).
pub struct ApprovalGate {
    clients: DashMap<String, ClientState>,
    attempts: Option<mpsc::UnboundedSender<String>>,
}

impl ApprovalGate {
    pub fn new(attempts: Option<mpsc::UnboundedSender<String>>) -> Self {
        Self {
            clients: DashMap::new(),
            attempts,
        }
    }

    pub fn is_approved(&self, ip: &str) -> bool {
        self.clients
            .get(ip)
            .is_some_and(|state| *state == ClientState::Approved)
    }

    pub fn state(&self, ip: &str) -> Option<ClientState> {
        self.clients.get(ip).map(|state| *state)
    }

    /// Record an unapproved attempt: the client (re-)enters pending and
    /// the host is notified. Rejected clients re-enter pending the same
    /// way; there is no lockout counter. Never blocks on the listener.
    pub fn record_attempt(&self, ip: &str) {
        if self.is_approved(ip) {
            return;
        }
        self.clients.insert(ip.to_string(), ClientState::Pending);
        if let Some(attempts) = &self.attempts {
            let _ = attempts.send(ip.to_string());
        }
    }

    pub fn approve(&self, ip: &str) {
        info!(client = %ip, "approving client");
        self.clients.insert(ip.to_string(), ClientState::Approved);
    }

    pub fn reject(&self, ip: &str) {
        info!(client = %ip, "rejecting client");
        self.clients.insert(ip.to_string(), ClientState::Rejected);
    }

    pub fn pending(&self) -> Vec<String> {
        self.clients
            .iter()
            .filter(|entry| *entry.value() == ClientState::Pending)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

/// Best-effort client IP: socket peer address when available, otherwise
/// the first `X-Forwarded-For` entry. `"unknown"` is never approvable.
pub fn client_ip(req: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission middleware: approved clients pass through, everyone else
/// gets 401 and triggers a notification toward the host. `OPTIONS`
/// never reaches this point; the CORS layer answers preflights itself.
pub async fn admission_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.require_approval {
        return next.run(req).await;
    }

    let ip = client_ip(&req);
    if ip != "unknown" && state.gate.is_approved(&ip) {
        debug!(client = %ip, "client approved, admitting request");
        return next.run(req).await;
    }

    warn!(client = %ip, method = %req.method(), path = %req.uri().path(), "unapproved client, returning 401");
    state.gate.record_attempt(&ip);
    unauthorized_response(req.uri().path(), &ip)
}

fn unauthorized_response(path: &str, ip: &str) -> Response {
    if path.starts_with("/api/") {
        return ServerError::NotAuthorized.into_response();
    }

    let page = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Authorization Required</title>
    <style>
        body {{ font-family: sans-serif; text-align: center; padding: 50px; background-color: #282c34; color: #abb2bf; }}
        h1 {{ color: #e06c75; }}
        p {{ margin-bottom: 20px; }}
        strong {{ color: #61afef; }}
    </style>
</head>
<body>
    <h1>Connection Approval Required</h1>
    <p>Approve this connection on the device running the server, then refresh this page.</p>
    <p><strong>Your IP address: {ip}</strong></p>
</body>
</html>"#
    );
    (StatusCode::UNAUTHORIZED, Html(page)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_client_is_not_approved() {
        let gate = ApprovalGate::new(None);
        assert!(!gate.is_approved("10.0.0.1"));
        assert_eq!(gate.state("10.0.0.1"), None);
    }

    #[test]
    fn attempt_then_approve() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = ApprovalGate::new(Some(tx));

        gate.record_attempt("10.0.0.1");
        assert_eq!(gate.state("10.0.0.1"), Some(ClientState::Pending));
        assert_eq!(rx.try_recv().unwrap(), "10.0.0.1");
        assert_eq!(gate.pending(), vec!["10.0.0.1".to_string()]);

        gate.approve("10.0.0.1");
        assert!(gate.is_approved("10.0.0.1"));

        // Attempts from an approved client neither demote nor notify.
        gate.record_attempt("10.0.0.1");
        assert!(gate.is_approved("10.0.0.1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rejected_client_reenters_pending_and_renotifies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = ApprovalGate::new(Some(tx));

        gate.record_attempt("10.0.0.2");
        rx.try_recv().unwrap();
        gate.reject("10.0.0.2");
        assert_eq!(gate.state("10.0.0.2"), Some(ClientState::Rejected));
        assert!(!gate.is_approved("10.0.0.2"));

        gate.record_attempt("10.0.0.2");
        assert_eq!(gate.state("10.0.0.2"), Some(ClientState::Pending));
        assert_eq!(rx.try_recv().unwrap(), "10.0.0.2");
    }

    #[test]
    fn gate_works_without_listener() {
        let gate = ApprovalGate::new(None);
        gate.record_attempt("10.0.0.3");
        assert_eq!(gate.state("10.0.0.3"), Some(ClientState::Pending));
    }
}
