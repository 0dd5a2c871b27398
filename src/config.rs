use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    /// Max concurrent per-employee computations during batch generation.
    pub generation_concurrency: usize,
    /// Attempts per employee when an obligation's optimistic version check
    /// loses a race with a concurrent settlement.
    pub commit_retry_limit: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a valid port number"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            generation_concurrency: env::var("GENERATION_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .expect("GENERATION_CONCURRENCY must be a number"),
            commit_retry_limit: env::var("COMMIT_RETRY_LIMIT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("COMMIT_RETRY_LIMIT must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
