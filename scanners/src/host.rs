//! Scanner host - validates platform blocks and activates scanners.
//!
//! Each `[[device_tracker]]` block names a platform. The host validates the
//! block against that scanner's schema and calls its setup routine. A block
//! that fails is declined and logged; the remaining blocks still activate.

use crate::registry::get_all_scanners;
use crate::scanner::{Scanner, ScannerContext};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracker::config::RawPlatformConfig;

/// Outcome of one platform block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformStatus {
    Activated,
    Declined(String),
}

/// Result of [`ScannerHost::setup_component`], one entry per block in order
#[derive(Clone, Debug, Default)]
pub struct SetupReport {
    pub platforms: Vec<(String, PlatformStatus)>,
}

impl SetupReport {
    pub fn activated(&self) -> usize {
        self.platforms
            .iter()
            .filter(|(_, status)| *status == PlatformStatus::Activated)
            .count()
    }

    pub fn declined(&self) -> usize {
        self.platforms.len() - self.activated()
    }

    pub fn all_activated(&self) -> bool {
        self.declined() == 0
    }
}

/// Registry of scanners plus the context they are activated with
pub struct ScannerHost {
    ctx: ScannerContext,
    scanners: HashMap<String, Arc<dyn Scanner>>,
}

impl ScannerHost {
    /// Host with the built-in scanners registered
    pub fn new(ctx: ScannerContext) -> Self {
        let mut host = Self::empty(ctx);
        for scanner in get_all_scanners() {
            host.register(scanner);
        }
        host
    }

    /// Host with no scanners registered
    pub fn empty(ctx: ScannerContext) -> Self {
        Self {
            ctx,
            scanners: HashMap::new(),
        }
    }

    /// Register a scanner, replacing any scanner with the same platform name
    pub fn register(&mut self, scanner: Arc<dyn Scanner>) {
        let platform = scanner.platform().to_string();
        if self.scanners.insert(platform.clone(), scanner).is_some() {
            info!(platform = %platform, "Replaced registered scanner");
        }
    }

    /// Registered platform names, sorted
    pub fn platforms(&self) -> Vec<&str> {
        let mut platforms: Vec<&str> = self.scanners.keys().map(String::as_str).collect();
        platforms.sort_unstable();
        platforms
    }

    /// Validate and activate every platform block.
    pub async fn setup_component(&self, blocks: &[RawPlatformConfig]) -> SetupReport {
        let mut report = SetupReport::default();

        if blocks.is_empty() {
            warn!("No device_tracker platforms configured");
        }

        for block in blocks {
            let name = block.platform_name().unwrap_or("<missing>").to_string();
            let status = self.setup_platform(block).await;

            match &status {
                PlatformStatus::Activated => info!(platform = %name, "Platform activated"),
                PlatformStatus::Declined(reason) => {
                    error!(platform = %name, reason = %reason, "Platform declined activation")
                }
            }

            report.platforms.push((name, status));
        }

        report
    }

    async fn setup_platform(&self, block: &RawPlatformConfig) -> PlatformStatus {
        let Some(platform) = block.platform_name() else {
            return PlatformStatus::Declined("'platform' is required".to_string());
        };

        let Some(scanner) = self.scanners.get(platform) else {
            return PlatformStatus::Declined(format!("unknown platform '{}'", platform));
        };

        let config = match scanner.validate(block) {
            Ok(config) => config,
            Err(e) => return PlatformStatus::Declined(format!("invalid config: {}", e)),
        };

        match scanner.setup_scanner(&self.ctx, &config).await {
            Ok(true) => PlatformStatus::Activated,
            Ok(false) => PlatformStatus::Declined("setup returned false".to_string()),
            Err(e) => PlatformStatus::Declined(format!("setup failed: {:#}", e)),
        }
    }
}
