/// Authentication module
///
/// Handles claim construction, JWT encoding/decoding and the issuance
/// authorization check.

mod authorization;
mod claims;
mod jwt;

pub use authorization::AuthorizationGate;
pub use authorization::PrivilegeLevel;
pub use claims::parse_timestamp;
pub use claims::Claims;
pub use jwt::TokenCodec;
