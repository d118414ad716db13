//! Scanner registry - the platforms available to the host.

use crate::scanners::{MqttJsonScanner, MqttScanner};
use crate::Scanner;
use std::sync::Arc;

/// Returns all built-in scanners.
pub fn get_all_scanners() -> Vec<Arc<dyn Scanner>> {
    vec![Arc::new(MqttJsonScanner::new()), Arc::new(MqttScanner::new())]
}
