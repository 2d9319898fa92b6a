//! Personal file-sharing HTTP server.
//!
//! Exposes one chosen directory tree to browsers on the local network:
//! directory listing, download, upload, rename, delete and directory
//! creation, all addressed through logical paths (`/docs/notes.txt`)
//! rather than native filesystem paths. The crate can be embedded by a
//! host application or run standalone via the `shareport` binary.

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod node;
pub mod resolve;
pub mod routes;

use std::sync::Arc;

pub use config::Config;
pub use error::ServerError;
pub use gate::ApprovalGate;
pub use node::{FsNode, Node};

/// URL scheme the server is reachable under. TLS termination happens
/// outside this crate; the scheme only affects generated absolute URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// How the server is addressed from other machines on the network.
///
/// Entirely optional: when the host cannot determine its own IP, absolute
/// URLs in listings are `null` and the UI shell is served without the
/// injected base-URL script.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub scheme: Scheme,
    pub ip: String,
    pub port: u16,
}

impl ServerIdentity {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.ip, self.port)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Root node of the shared tree, fixed for the server's lifetime
    pub root: Arc<dyn Node>,
    /// Configuration
    pub config: Arc<Config>,
    /// Scheme/IP/port used for absolute URL generation, if known
    pub identity: Option<ServerIdentity>,
    /// Per-client-IP admission gate
    pub gate: Arc<ApprovalGate>,
}

impl AppState {
    pub fn new(
        root: Arc<dyn Node>,
        config: Config,
        identity: Option<ServerIdentity>,
        gate: Arc<ApprovalGate>,
    ) -> Self {
        Self {
            root,
            config: Arc::new(config),
            identity,
            gate,
        }
    }

    /// `<scheme>://<ip>:<port>` when the server identity is known.
    pub fn base_url(&self) -> Option<String> {
        self.identity.as_ref().map(ServerIdentity::base_url)
    }
}
