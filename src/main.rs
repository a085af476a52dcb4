use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use phone_otp_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{NoopSmsGateway, SmsGateway, TwilioService},
    handlers,
    middlewares::create_cors,
    services::{OtpService, SeaOrmUserRepository, TokenService, UserRepository},
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");
    let environment = config.environment;

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt).expect("Failed to create JWT service");

    let gateway: Arc<dyn SmsGateway> = if config.twilio.is_configured() {
        Arc::new(TwilioService::new(config.twilio.clone()))
    } else {
        log::warn!("Twilio credentials missing, one-time passwords will not be delivered");
        Arc::new(NoopSmsGateway)
    };

    let otp_service = OtpService::new(pool.clone(), gateway, config.otp.clone());
    let users: Arc<dyn UserRepository> = Arc::new(SeaOrmUserRepository::new(pool.clone()));
    let token_service = TokenService::new(jwt_service, users);

    log::info!(
        "Starting HTTP server at {}:{} ({:?})",
        config.server.host,
        config.server.port,
        environment
    );

    HttpServer::new(move || {
        let logger = if environment.is_production() {
            Logger::default()
        } else {
            Logger::new("%r %s %T")
        };

        App::new()
            .wrap(logger)
            .wrap(create_cors())
            .app_data(web::Data::new(otp_service.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(environment))
            .app_data(handlers::json_config(environment))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::auth_config))
            .default_service(web::route().to(handlers::invalid_endpoint))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
