//! Bulk CSV import: upload, then follow the server-side job to completion.

/// HTTP endpoints of the import job service.
pub mod api;
/// Local validation and submission.
pub mod initiator;
/// Progress channel state machine.
pub mod monitor;
/// Server-Sent Events decoding.
pub mod sse;
/// Data model shared with the UI.
pub mod types;
