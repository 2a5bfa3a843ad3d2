use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let chapa = super::config_model::Chapa {
        secret_key: std::env::var("CHAPA_SECRET_KEY").expect("CHAPA_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("CHAPA_WEBHOOK_SECRET")
            .expect("CHAPA_WEBHOOK_SECRET is invalid"),
        base_url: std::env::var("CHAPA_BASE_URL").ok(),
    };

    let payment = super::config_model::Payment {
        success_url: std::env::var("PAYMENT_SUCCESS_URL").expect("PAYMENT_SUCCESS_URL is invalid"),
        cancel_url: std::env::var("PAYMENT_CANCEL_URL").expect("PAYMENT_CANCEL_URL is invalid"),
        poll_attempts: std::env::var("PAYMENT_POLL_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()?,
        poll_backoff_ms: std::env::var("PAYMENT_POLL_BACKOFF_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()?,
    };

    let subscription = super::config_model::Subscription {
        success_url: std::env::var("SUBSCRIPTION_SUCCESS_URL")
            .expect("SUBSCRIPTION_SUCCESS_URL is invalid"),
        cancel_url: std::env::var("SUBSCRIPTION_CANCEL_URL")
            .expect("SUBSCRIPTION_CANCEL_URL is invalid"),
        snapshot_ttl_seconds: std::env::var("SUBSCRIPTION_SNAPSHOT_TTL_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        chapa,
        payment,
        subscription,
    })
}
