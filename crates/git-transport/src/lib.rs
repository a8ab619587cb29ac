//! Transport abstraction for git wire protocol communication.
//!
//! This crate provides the physical transport layer used by `git-protocol`'s
//! wire negotiation: a byte-oriented duplex connection to a remote
//! `git-upload-pack` or `git-receive-pack` process. Only the local
//! (direct-subprocess) transport lives here; SSH session plumbing and
//! HTTP/SFTP transports are external collaborators that implement the same
//! [`Transport`] trait.

pub mod local;

use std::io::{Read, Write};

use bstr::BString;
use git_hash::ObjectId;

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A local (file-path) repository location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUrl {
    pub path: String,
}

impl std::fmt::Display for GitUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Service type for git transport connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// git-upload-pack (for fetch/clone).
    UploadPack,
    /// git-receive-pack (for push).
    ReceivePack,
}

impl Service {
    /// Service name as used in the protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::UploadPack => "git-upload-pack",
            Service::ReceivePack => "git-receive-pack",
        }
    }
}

/// Protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V0,
    V1,
    V2,
}

/// Result of the initial transport handshake.
#[derive(Debug)]
pub struct HandshakeResult {
    pub protocol_version: ProtocolVersion,
    pub capabilities: Vec<String>,
    /// Advertised refs: (OID, refname). Empty for v2 (refs come via ls-refs).
    pub refs: Vec<(ObjectId, BString)>,
    /// Raw initial response lines for protocol parsing.
    pub extra_lines: Vec<Vec<u8>>,
}

/// Trait for transport connections.
///
/// A transport provides bidirectional I/O with a remote git process.
/// The connection lifecycle is:
/// 1. Connect via `connect()` function
/// 2. Read/write using the reader/writer
/// 3. Close when done
pub trait Transport: Send {
    /// Get a reader for the server's response.
    fn reader(&mut self) -> &mut dyn Read;

    /// Get a writer for sending data to the server.
    fn writer(&mut self) -> &mut dyn Write;

    /// Close the transport connection.
    fn close(self: Box<Self>) -> Result<(), TransportError>;

    /// Whether this transport supports stateless operation (e.g. HTTP).
    fn is_stateless(&self) -> bool {
        false
    }
}

/// Open a local transport connection for the given path and service.
pub fn connect(url: &GitUrl, service: Service) -> Result<Box<dyn Transport>, TransportError> {
    local::connect(url, service)
}
