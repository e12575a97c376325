//! # Config Commands

use tracing::debug;

use crate::state::ConfigState;

/// Gets the station configuration.
///
/// ## When Used
/// - Register startup (store name, terminal, currency formatting)
/// - Showing the grace period and default discount at the entrance
pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_serializes_camel_case() {
        let config = ConfigState::default();
        let json = serde_json::to_value(get_config(&config)).unwrap();

        assert_eq!(json["storeName"], "Kiosk Play Area");
        assert_eq!(json["graceMinutes"], 5);
        assert!(json["dbPath"].is_null());
    }
}
