//! ─── Podgate protocol constants ─────────────────────────────────────────────
//!
//! Gas costs and size limits shared across handlers and decorators. All
//! values are consensus-relevant: changing one changes replica results.

// ── Gas ──────────────────────────────────────────────────────────────────────

/// Gas allocated by the artifact create handler during Check.
pub const CREATE_ARTIFACT_COST: u64 = 100;

/// Gas allocated by the artifact delete handler during Check.
pub const DELETE_ARTIFACT_COST: u64 = 100;

/// Gas charged for every role reached during RBAC expansion.
pub const ROLE_PARTICIPANT_GAS_COST: u64 = 10;

// ── Limits ───────────────────────────────────────────────────────────────────

/// Maximum length of an artifact image reference in bytes.
pub const MAX_IMAGE_LENGTH: usize = 255;

/// Maximum length of a permission token.
pub const MAX_PERMISSION_LENGTH: usize = 128;

/// Minimum length of a permission token.
pub const MIN_PERMISSION_LENGTH: usize = 2;

/// Maximum length of role and principal names.
pub const MAX_NAME_LENGTH: usize = 64;

// ── Routing ──────────────────────────────────────────────────────────────────

/// Domain tag prefixed to every permission derived from a message route.
pub const PERMISSION_DOMAIN: &str = "_podgate";
