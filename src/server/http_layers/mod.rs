mod client_ip;
mod requests_logging;

pub use client_ip::{client_identity, ClientIdentity, UNKNOWN_CLIENT};
pub use requests_logging::{log_requests, RequestsLoggingLevel};
