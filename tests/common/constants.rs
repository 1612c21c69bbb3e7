//! Shared constants for end-to-end tests
//!
//! When the bundled sound map or fake collaborator output changes,
//! update only this file.

// ============================================================================
// Charms from the bundled sound map
// ============================================================================

/// Charm in the D (Re) category, Harpsichord lead
pub const CHARM_D: &str = "성실함";

/// Charm in the E (Mi) category
pub const CHARM_E: &str = "다정함";

/// Charm in the C (Do) category
pub const CHARM_C: &str = "침착함";

/// Charm in the G (Sol) category
pub const CHARM_G: &str = "정직함";

/// Charm in the B (Si) category
pub const CHARM_B: &str = "목표의식";

/// Name that is not in the sound map
pub const UNKNOWN_CHARM: &str = "존재하지않는매력";

pub const BUNDLED_CATEGORY_COUNT: usize = 7;
pub const BUNDLED_CHARM_COUNT: usize = 49;

// ============================================================================
// Fake collaborators
// ============================================================================

/// Text returned by the fake LLM, wrapped in a code fence.
pub const FAKE_REFINED_PROMPT: &str = "A bright, structured harpsichord ringtone";

/// Bytes returned by the fake audio generator.
pub const FAKE_AUDIO_BYTES: &[u8] = &[0x49, 0x44, 0x33, 0x04];

/// `FAKE_AUDIO_BYTES` in standard base64.
pub const FAKE_AUDIO_BASE64: &str = "SUQzBA==";

pub const FAKE_AUDIO_MIME: &str = "audio/mpeg";

/// Client address sent through `X-Forwarded-For` by default.
pub const TEST_CLIENT_IP: &str = "203.0.113.10";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server readiness (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// HTTP request timeout for test client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
