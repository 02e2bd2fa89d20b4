//! Domain identifiers
//!
//! Domain IDs are time-ordered UUIDs (v7) encoded with base64url (no
//! padding): 22 characters, valid as a directory name everywhere.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

/// Length of a generated domain ID
pub const DOMAIN_ID_LEN: usize = 22;

/// Generate a new, globally unique domain ID
pub fn generate_domain_id() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::now_v7().as_bytes())
}

/// Whether `candidate` can be used as a domain directory name
///
/// Adopted directories are not necessarily generated by
/// [`generate_domain_id`], so this only rejects names that cannot be a
/// single path segment.
pub fn is_valid_domain_dir_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate != "."
        && candidate != ".."
        && !candidate.contains(['/', '\\', '\0'])
}
