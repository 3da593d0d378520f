//! Unified error type for the BCNP crates.

use bcnp_protocol::ProtocolError;
use bcnp_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps the per-crate errors.
///
/// These only appear at setup time (loading config, binding a transport)
/// or on the sending side (encoding). Nothing inside `Engine::tick`
/// returns an error; every ingestion outcome is handled there.
#[derive(Debug, thiserror::Error)]
pub enum BcnpError {
    /// A transport could not be created or has failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
