//! Policy ID encoding
//!
//! Policy IDs are arbitrary strings (URNs, paths, unicode...). On disk each
//! policy gets a directory whose name is the base64url (no padding)
//! encoding of its ID, which is safe as a filename on any OS.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{PapError, PapResult};

/// Encode a policy ID into a filesystem-safe directory name
pub fn encode_policy_id(policy_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(policy_id.as_bytes())
}

/// Decode a directory name back into the policy ID
///
/// Inverse of [`encode_policy_id`].
pub fn decode_policy_id(encoded: &str) -> PapResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|e| PapError::InvalidPolicyId {
            encoded: encoded.to_string(),
            reason: e.to_string(),
        })?;

    String::from_utf8(bytes).map_err(|e| PapError::InvalidPolicyId {
        encoded: encoded.to_string(),
        reason: e.to_string(),
    })
}
