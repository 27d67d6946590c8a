use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = listen_addr(
            &std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            &std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into()),
        )?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dietplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "dietplan-users".into()),
        };
        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            jwt,
        })
    }
}

/// `APP_HOST` and `APP_PORT` joined into a socket address. IPv6 hosts may be bracketed or bare.
pub fn listen_addr(host: &str, port: &str) -> anyhow::Result<SocketAddr> {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("APP_PORT {port:?} is not a port number"))?;
    let ip = host
        .parse()
        .with_context(|| format!("APP_HOST {host:?} is not an IP address"))?;
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_accepts_v4_and_v6_hosts() {
        assert_eq!(listen_addr("0.0.0.0", "8080").unwrap().to_string(), "0.0.0.0:8080");
        assert_eq!(listen_addr("[::1]", "3000").unwrap().to_string(), "[::1]:3000");
        assert_eq!(listen_addr("::", " 80 ").unwrap().port(), 80);
    }

    #[test]
    fn listen_addr_names_the_bad_variable() {
        let err = listen_addr("0.0.0.0", "http").unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
        let err = listen_addr("localhost", "8080").unwrap_err();
        assert!(err.to_string().contains("APP_HOST"));
    }
}
