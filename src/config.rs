use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub refresh_expiration_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the MySQL parts below.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub ssl_redirect: bool,
    pub hsts_seconds: u64,
    pub bcrypt_cost: u32,
}

/// Superuser created at start-up when it does not exist yet.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv::dotenv().ok();

        let admin = match (
            env::var("ADMIN_USERNAME"),
            env::var("ADMIN_EMAIL"),
            env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(AdminConfig {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("SERVER_PORT", 8080),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "your-secret-key-change-this".to_string()),
                expiration_hours: env_or("JWT_EXPIRATION_HOURS", 24),
                refresh_expiration_days: env_or("JWT_REFRESH_EXPIRATION_DAYS", 7),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                host: env::var("MYSQL_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env_or("MYSQL_PORT", 3306),
                user: env::var("MYSQL_USER").unwrap_or_else(|_| "root".to_string()),
                password: env::var("MYSQL_PASSWORD").unwrap_or_else(|_| "password".to_string()),
                database: env::var("MYSQL_DATABASE")
                    .unwrap_or_else(|_| "social_library".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            },
            security: SecurityConfig {
                ssl_redirect: env_or("SECURE_SSL_REDIRECT", false),
                hsts_seconds: env_or("SECURE_HSTS_SECONDS", 31_536_000),
                bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            },
            admin,
        })
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database.url {
            return url.clone();
        }
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                expiration_hours: 1,
                refresh_expiration_days: 1,
            },
            database: DatabaseConfig {
                url: None,
                host: "db".to_string(),
                port: 3307,
                user: "app".to_string(),
                password: "pw".to_string(),
                database: "library".to_string(),
                max_connections: 5,
            },
            security: SecurityConfig {
                ssl_redirect: false,
                hsts_seconds: 0,
                bcrypt_cost: 4,
            },
            admin: None,
        }
    }

    #[test]
    fn builds_mysql_url_from_parts() {
        assert_eq!(sample().database_url(), "mysql://app:pw@db:3307/library");
    }

    #[test]
    fn explicit_url_wins() {
        let mut config = sample();
        config.database.url = Some("sqlite::memory:".to_string());
        assert_eq!(config.database_url(), "sqlite::memory:");
    }
}
