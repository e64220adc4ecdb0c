pub use config::{Config, Environment, File as ConfigFile};
pub use once_cell::sync::OnceCell;

use bitcoin::network::constants::Network;

use crate::constants::DEFAULT_TX_PAGE_SIZE;
use crate::error::ExplorerError;
use crate::explorer::DEFAULT_RELAY_FEE_SAT;
use crate::script_utils::parse_network;
use crate::telemetry::TelemetryConfig;

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

/// Environment overrides look like `RUSTYINSIGHT_SERVER__LISTEN=127.0.0.1:8080`
const ENV_PREFIX: &str = "RUSTYINSIGHT";

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
pub const DEFAULT_NETWORK: &str = "testnet";
pub const DEFAULT_SNAPSHOT_PATH: &str = "./data/snapshot.json";

/// Read `path` (optional) layered under the environment
pub fn load_config(path: &str) -> Result<Config, ExplorerError> {
    let config = Config::builder()
        .add_source(ConfigFile::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(config)
}

pub fn init_global_config(path: &str) -> Result<&'static Config, ExplorerError> {
    let config = load_config(path)?;
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| ExplorerError::Config("Config already set".to_string()))?;
    get_global_config()
}

pub fn get_global_config() -> Result<&'static Config, ExplorerError> {
    GLOBAL_CONFIG
        .get()
        .ok_or_else(|| ExplorerError::Config("Config not initialized".to_string()))
}

/// Typed view of the settings the service reads
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen: String,
    pub network: Network,
    pub snapshot_path: String,
    pub tx_page_size: usize,
    pub relay_fee_sat: i64,
    pub telemetry: TelemetryConfig,
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self, ExplorerError> {
        let listen = config
            .get_string("server.listen")
            .unwrap_or_else(|_| DEFAULT_LISTEN.to_string());

        let network_name = config
            .get_string("network.name")
            .unwrap_or_else(|_| DEFAULT_NETWORK.to_string());
        let network = parse_network(&network_name)
            .ok_or_else(|| ExplorerError::Config(format!("Unknown network: {}", network_name)))?;

        let snapshot_path = config
            .get_string("snapshot.path")
            .unwrap_or_else(|_| DEFAULT_SNAPSHOT_PATH.to_string());

        let tx_page_size = match config.get_int("api.tx_page_size") {
            Ok(size) if size > 0 => size as usize,
            Ok(size) => {
                return Err(ExplorerError::Config(format!(
                    "api.tx_page_size must be positive, got {}",
                    size
                )))
            }
            Err(_) => DEFAULT_TX_PAGE_SIZE,
        };

        let relay_fee_sat = config
            .get_int("api.relay_fee_sat")
            .unwrap_or(DEFAULT_RELAY_FEE_SAT);

        let defaults = TelemetryConfig::default();
        let telemetry = TelemetryConfig {
            log_level: config.get_string("logging.level").unwrap_or(defaults.log_level),
            log_format: config.get_string("logging.format").unwrap_or(defaults.log_format),
            log_file: config.get_string("logging.file").ok(),
            rotation: config.get_string("logging.rotation").unwrap_or(defaults.rotation),
        };

        Ok(Self {
            listen,
            network,
            snapshot_path,
            tx_page_size,
            relay_fee_sat,
            telemetry,
        })
    }
}
