//! Ordered single-line JSON logging for `tracing`, with per-request
//! tracking identifiers (`trans`/`corr`/`op`) propagated through
//! thread-local context instead of explicit parameters.

pub mod context;
pub mod record;
pub mod filter;
pub mod format;
pub mod layer;
pub mod init;
