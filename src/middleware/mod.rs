/// Middleware module
///
/// Token authentication for the management API.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
