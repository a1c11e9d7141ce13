use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

/// Storage engine selected at ignite time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    MongoDb,
}

pub struct Config;

impl Config {
    fn profile() -> String {
        let fallback = if cfg!(debug_assertions) { "debug" } else { "release" };
        env::var("ROCKET_PROFILE").unwrap_or_else(|_| fallback.to_string())
    }

    pub fn figment() -> Figment {
        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
            .select(Self::profile())
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn jwt_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_expiry")
            .unwrap_or(900)
    }

    pub fn storage_backend() -> StorageBackend {
        let raw: String = Self::figment()
            .extract_inner("storage_backend")
            .unwrap_or_else(|_| "memory".to_string());

        match raw.to_lowercase().as_str() {
            "mongodb" | "mongo" => StorageBackend::MongoDb,
            _ => StorageBackend::Memory,
        }
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string())
    }

    pub fn mongodb_database() -> String {
        Self::figment()
            .extract_inner("mongodb_database")
            .unwrap_or_else(|_| "collabmarket".to_string())
    }

    pub fn notification_webhook_url() -> Option<String> {
        Self::figment()
            .extract_inner::<String>("notification_webhook_url")
            .ok()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn auto_approve_advertisements() -> bool {
        Self::figment()
            .extract_inner("auto_approve_advertisements")
            .unwrap_or(true)
    }
}
