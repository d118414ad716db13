use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracker::config::{ConfigError, PlatformConfig, RawPlatformConfig};
use tracker::{DeviceTracker, MessageTransport};

/// Shared services handed to every scanner at setup.
///
/// Lives as long as the host; scanners keep clones of the `Arc`s inside
/// their message handlers.
#[derive(Clone)]
pub struct ScannerContext {
    /// Transport used to subscribe to device topics
    pub bus: Arc<dyn MessageTransport>,

    /// Receives location reports (`see`)
    pub tracker: Arc<DeviceTracker>,
}

impl ScannerContext {
    pub fn new(bus: Arc<dyn MessageTransport>, tracker: Arc<DeviceTracker>) -> Self {
        Self { bus, tracker }
    }
}

/// Device tracker platform integration.
///
/// # Lifecycle
/// 1. The host looks the scanner up by `platform()`
/// 2. `validate()` turns the raw configuration block into a typed config
/// 3. `setup_scanner()` subscribes to the device topics
/// 4. Message handlers report positions through `ScannerContext::tracker`
///
/// # Example
/// ```no_run
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use device_scanners::{Scanner, ScannerContext};
/// use tracker::config::PlatformConfig;
///
/// struct NullScanner;
///
/// #[async_trait]
/// impl Scanner for NullScanner {
///     fn platform(&self) -> &str {
///         "null"
///     }
///
///     async fn setup_scanner(&self, _ctx: &ScannerContext, _config: &PlatformConfig) -> Result<bool> {
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Platform name matched against the `platform` key of a configuration block
    fn platform(&self) -> &str;

    /// Validate a raw configuration block.
    ///
    /// Defaults to the MQTT platform schema, which injects the default QoS.
    fn validate(&self, raw: &RawPlatformConfig) -> Result<PlatformConfig, ConfigError> {
        PlatformConfig::validate(raw)
    }

    /// Activate the scanner.
    ///
    /// # Returns
    /// * `Ok(true)` - scanner is running
    /// * `Ok(false)` - scanner declined activation
    /// * `Err(...)` - setup failed (e.g. a subscription was refused)
    async fn setup_scanner(&self, ctx: &ScannerContext, config: &PlatformConfig) -> Result<bool>;
}
