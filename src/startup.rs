use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::middleware::{GatewayAuth, RequestLogger};
use crate::routes::{get_current_principal, health_check, login, logout, refresh, register, validate};
use crate::session::SessionManager;

pub fn run(listener: TcpListener, sessions: Arc<SessionManager>) -> Result<Server, std::io::Error> {
    let sessions_data = web::Data::from(sessions.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(sessions_data.clone())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/v1/auth")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/validate", web::post().to(validate))
                    // Protected routes (require a live access token)
                    .service(
                        web::resource("/logout")
                            .wrap(GatewayAuth::new(sessions.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(GatewayAuth::new(sessions.clone()))
                            .route(web::get().to(get_current_principal)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
