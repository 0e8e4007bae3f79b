/// Issuance authorization
///
/// A token's bearer effectively assumes the target subject's full capability
/// set, so minting one is gated at least as strictly as impersonation.

use serde::{Deserialize, Serialize};

/// Numeric rank summarising a subject's capability set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrivilegeLevel(pub u32);

pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Whether a requester may mint a token for a subject of the given effective level
    pub fn can_issue_for(requester: PrivilegeLevel, target: PrivilegeLevel) -> bool {
        requester >= target
    }
}
