use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::dispatch_service::DispatchService;
use crate::services::history_service::HistoryService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env().expect("Configuración de entorno incompleta");

    // El transporte SMTP se construye por petición con las credenciales del
    // llamante; los servicios solo cargan el cliente del bucket.
    let history_service = HistoryService::new(&config);
    let dispatch_service = DispatchService::new();

    let port = config.port;
    log::info!("Levantando servidor en 0.0.0.0:{}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::AUTHORIZATION,
            ]);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(history_service.clone()))
            .app_data(web::Data::new(dispatch_service.clone()))
            .configure(app::init_app)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
