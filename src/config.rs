//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment
//! variables into a type-safe struct, which is then passed explicitly into
//! the services that need it — there is no global configuration state.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::services::escrow_service::EscrowConfig;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DEFAULT_PLATFORM_FEE_PERCENTAGE` (optional): fee applied when an
///   inbound task event does not carry one, defaults to 0.05
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_platform_fee")]
    pub default_platform_fee_percentage: Decimal,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default platform fee percentage (5%).
fn default_platform_fee() -> Decimal {
    Decimal::new(5, 2)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Attempts to load a `.env` file first (optional), then reads
    /// environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing (e.g.
    /// DATABASE_URL) or values cannot be parsed into the expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// The slice of configuration the escrow service needs.
    pub fn escrow(&self) -> EscrowConfig {
        EscrowConfig {
            default_platform_fee_percentage: self.default_platform_fee_percentage,
        }
    }
}
