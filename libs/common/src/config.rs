//! Service configuration
//!
//! The storage backend is selected exactly once at startup; there is no
//! runtime probing or fallback between providers.

use anyhow::{Result, anyhow};
use std::env;

/// Which storage provider backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL plus Redis for presence (production)
    Postgres,
    /// In-memory fixture provider (tests, demos, local development)
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown storage backend: {}", other)),
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage provider to use
    pub backend: StorageBackend,
    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_BACKEND`: "postgres" or "memory" (default: "postgres")
    /// - `BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => StorageBackend::parse(&value)?,
            Err(_) => StorageBackend::Postgres,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(AppConfig { backend, bind_addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn app_config_defaults() {
        unsafe {
            std::env::remove_var("STORAGE_BACKEND");
            std::env::remove_var("BIND_ADDR");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.backend, StorageBackend::Postgres);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    #[serial]
    fn app_config_memory_backend() {
        unsafe {
            std::env::set_var("STORAGE_BACKEND", "memory");
            std::env::set_var("BIND_ADDR", "127.0.0.1:8080");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");

        unsafe {
            std::env::remove_var("STORAGE_BACKEND");
            std::env::remove_var("BIND_ADDR");
        }
    }

    #[test]
    #[serial]
    fn app_config_rejects_unknown_backend() {
        unsafe {
            std::env::set_var("STORAGE_BACKEND", "sled");
        }

        assert!(AppConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("STORAGE_BACKEND");
        }
    }
}
