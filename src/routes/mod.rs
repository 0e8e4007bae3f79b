mod health_check;
mod refresh;
pub mod response;
mod tokens;

pub use health_check::health_check;
pub use refresh::refresh_token;
pub use response::{json_error_handler, query_error_handler};
pub use tokens::{generate_token, list_tokens, register_token, revoke_token};
