// SPDX-License-Identifier: MIT
//! Environment variable loading (spec §6.4). One flat config struct built
//! from `std::env`, following the teacher's `sven-config::loader` layering
//! convention (defaults, then environment overrides) but without a YAML
//! config file layer — spec.md names only environment variables here.
use std::env;

/// Recognized options from spec §6.4.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub llm_provider_key: Option<String>,
    pub llm_provider_url: Option<String>,
    pub llm_provider_model: String,
    pub port: u16,
    pub data_dir: String,
    pub jwt_secret: Option<String>,
    pub invite_code_required: bool,
    pub log_level: String,
}

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_PORT: u16 = 5200;

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            llm_provider_key: None,
            llm_provider_url: None,
            llm_provider_model: DEFAULT_MODEL.to_string(),
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            jwt_secret: None,
            invite_code_required: false,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load from the process environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm_provider_key: env::var("LLM_PROVIDER_KEY").ok(),
            llm_provider_url: env::var("LLM_PROVIDER_URL").ok(),
            llm_provider_model: env::var("LLM_PROVIDER_MODEL").unwrap_or(defaults.llm_provider_model),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            jwt_secret: env::var("JWT_SECRET").ok(),
            invite_code_required: env::var("INVITE_CODE_REQUIRED")
                .ok()
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.invite_code_required),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn default_data_dir() -> String {
    dirs::home_dir()
        .map(|home| home.join(".agentx").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".agentx".to_string())
}
