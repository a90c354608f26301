//! Startup configuration read from the environment (after `.env` is merged).

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::security::PayloadScheme;

/// Where license records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    MongoDb,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::MongoDb => "mongodb",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            other => Err(format!("unknown license store '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub hmac_secret: String,
    pub private_key_pem: String,
    /// None = derive from the private key
    pub public_key_pem: Option<String>,
    pub admin_api_key: Option<String>,
    pub payload_scheme: PayloadScheme,
    pub store_backend: StoreBackend,
    pub seed_file: Option<PathBuf>,
    pub mongodb_uri: String,
    pub database_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match get("PORT").or_else(|| get("SERVER_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let hmac_secret = get("HMAC_SECRET").ok_or(ConfigError::Missing("HMAC_SECRET"))?;

        let private_key_pem = match get("PRIVATE_KEY") {
            Some(pem) => pem,
            None => {
                let path = get("PRIVATE_KEY_PATH").unwrap_or_else(|| "private_key.pem".to_string());
                read_key_file("PRIVATE_KEY", Path::new(&path))?
            }
        };

        let public_key_pem = match get("PUBLIC_KEY") {
            Some(pem) => Some(pem),
            None => match get("PUBLIC_KEY_PATH") {
                Some(path) => Some(read_key_file("PUBLIC_KEY", Path::new(&path))?),
                None => {
                    let default = Path::new("public_key.pem");
                    if default.exists() {
                        Some(read_key_file("PUBLIC_KEY", default)?)
                    } else {
                        None
                    }
                }
            },
        };

        let payload_scheme = parse_or_default(get("PAYLOAD_ENCRYPTION"), "PAYLOAD_ENCRYPTION", PayloadScheme::V2)?;
        let store_backend = parse_or_default(get("LICENSE_STORE"), "LICENSE_STORE", StoreBackend::Memory)?;

        Ok(Self {
            host,
            port,
            hmac_secret,
            private_key_pem,
            public_key_pem,
            admin_api_key: get("ADMIN_API_KEY"),
            payload_scheme,
            store_backend,
            seed_file: get("LICENSE_SEED_FILE").map(PathBuf::from),
            mongodb_uri: get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "licensing".to_string()),
        })
    }
}

fn read_key_file(name: &'static str, path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        name,
        path: path.display().to_string(),
        source,
    })
}

fn parse_or_default<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|reason| ConfigError::Invalid { name, reason }),
        None => Ok(default),
    }
}
