use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use azbp_directory::config::AppConfig;
use azbp_directory::database::Database;
use azbp_directory::handlers;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|err| {
        log::error!("Invalid configuration: {err}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;

    let db = Database::connect(&config.database_url, config.max_connections)
        .await
        .map_err(|err| {
            log::error!("Failed to initialize database: {err:?}");
            std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
        })?;
    log::info!("Migrations applied to {}", config.database_url);

    let bind_address = config.bind_address();
    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);

    log::info!("Starting AZ business directory service on {bind_address}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(web::scope("/api/v1").configure(handlers::configure_routes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
