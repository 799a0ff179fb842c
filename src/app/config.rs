/*
 * This file is part of wce.
 *
 * Copyright (C) 2026 the wce authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Process-wide configuration, loaded from `config/default` plus environment
//! overrides (teacher's `config`-crate layering, trimmed to what the core needs).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    server: ServerConfig,
    storage: StorageConfig,
    auth: AuthConfig,
    script: ScriptConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<uuid>.db` file per CENV.
    dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Process-wide HS256 signing secret (§4.D). If absent, a random 32-byte
    /// secret is generated at startup — every outstanding token is invalidated
    /// on restart (§9 design notes); set this for a durable deployment.
    jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "ScriptConfig::default_timeout_ms")]
    default_timeout_ms: u64,
}

impl ScriptConfig {
    fn default_timeout_ms() -> u64 {
        5_000
    }

    pub fn default_timeout_ms_value(&self) -> u64 {
        self.default_timeout_ms
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("WCE").separator("__"));
        builder.build()?.try_deserialize()
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    pub fn script(&self) -> &ScriptConfig {
        &self.script
    }
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl StorageConfig {
    pub fn dir(&self) -> &str {
        &self.dir
    }
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                dir: "./data".to_string(),
            },
            auth: AuthConfig { jwt_secret: None },
            script: ScriptConfig {
                default_timeout_ms: 5_000,
            },
        }
    }
}
