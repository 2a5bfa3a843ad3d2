#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub chapa: Chapa,
    pub payment: Payment,
    pub subscription: Subscription,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Chapa {
    pub secret_key: String,
    pub webhook_secret: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub success_url: String,
    pub cancel_url: String,
    pub poll_attempts: u32,
    pub poll_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub success_url: String,
    pub cancel_url: String,
    pub snapshot_ttl_seconds: u64,
}
