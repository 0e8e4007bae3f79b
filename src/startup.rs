use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::configuration::JwtSettings;
use crate::issuance::IssuanceService;
use crate::listing::ListingProjector;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::registry::TokenRegistry;
use crate::routes::{
    generate_token, health_check, json_error_handler, list_tokens, query_error_handler,
    refresh_token, register_token, revoke_token,
};
use crate::subjects::SubjectDirectory;
use crate::triggers::TriggerDispatcher;

/// Storage and collaborator implementations the server runs against
#[derive(Clone)]
pub struct Backends {
    pub registry: Arc<dyn TokenRegistry>,
    pub subjects: Arc<dyn SubjectDirectory>,
    pub dispatcher: Arc<dyn TriggerDispatcher>,
}

pub fn run(
    listener: TcpListener,
    base_url: String,
    jwt_config: JwtSettings,
    backends: Backends,
) -> Result<Server, std::io::Error> {
    let codec = Arc::new(TokenCodec::new(&jwt_config).map_err(|e| {
        tracing::error!("Invalid JWT configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?);

    let issuance = web::Data::new(IssuanceService::new(
        codec.clone(),
        backends.registry.clone(),
        jwt_config.refresh_ttl,
    ));
    let listing = web::Data::new(ListingProjector::new(
        codec.clone(),
        backends.registry.clone(),
        base_url,
        jwt_config.query_param.clone(),
    ));
    let subjects: web::Data<dyn SubjectDirectory> = web::Data::from(backends.subjects.clone());
    let jwt_middleware = JwtMiddleware::new(
        codec,
        backends.registry.clone(),
        backends.dispatcher.clone(),
        jwt_config.query_param.clone(),
    );
    let query_param = jwt_config.query_param.clone();

    let server = HttpServer::new(move || {
        App::new()
            // %U is the path without the query string, which may carry a token
            .wrap(Logger::new("%a \"%U\" %s %b %T"))
            .wrap(LoggerMiddleware::new(query_param.clone()))

            // Shared state
            .app_data(issuance.clone())
            .app_data(listing.clone())
            .app_data(subjects.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/jwt/refresh", web::post().to(refresh_token))

            // Token management (requires a valid, registered token)
            .service(
                web::scope("/api/jwt")
                    .wrap(jwt_middleware.clone())
                    .route("/generate", web::post().to(generate_token))
                    .route("/register", web::post().to(register_token))
                    .route("/revoke", web::post().to(revoke_token))
                    .route("/list", web::get().to(list_tokens)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
