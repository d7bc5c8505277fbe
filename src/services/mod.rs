/// Lookups over matches still in progress.
pub mod active_matches;
/// WebSocket channel for companion devices.
pub mod companion_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Stored match listing and statistics.
pub mod history_service;
/// Live match use cases.
pub mod match_service;
/// Guest-to-account data transfer.
pub mod migration;
/// Guest bootstrap, sign-in and entitlement.
pub mod session_service;
/// Server-Sent Events scoreboard feed.
pub mod sse_service;
