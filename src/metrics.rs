//! Run metrics for the catalog sync.
//!
//! A Prometheus recorder is installed in-process; the sync is a short-lived job,
//! so instead of serving `/metrics` the rendered exposition text can be written
//! to a file for a node-exporter textfile collector.

use crate::error::Result;
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

pub const PAGES_TOTAL: &str = "performer_sync_pages_total";
pub const PAGE_FAILURES_TOTAL: &str = "performer_sync_page_failures_total";
pub const RECORDS_FETCHED_TOTAL: &str = "performer_sync_records_fetched_total";
pub const CATALOG_SIZE: &str = "performer_sync_catalog_size";
pub const CATALOG_WRITES_TOTAL: &str = "performer_sync_catalog_writes_total";

/// Install the global recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Metrics handle was already set");
                }
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

pub fn record_page(brand: &str, records: usize) {
    ::metrics::counter!(PAGES_TOTAL, "brand" => brand.to_string()).increment(1);
    ::metrics::counter!(RECORDS_FETCHED_TOTAL, "brand" => brand.to_string())
        .increment(records as u64);
}

pub fn record_page_failure(brand: &str, kind: &'static str) {
    ::metrics::counter!(PAGE_FAILURES_TOTAL, "brand" => brand.to_string(), "kind" => kind)
        .increment(1);
}

pub fn record_catalog(size: usize, written: bool) {
    ::metrics::gauge!(CATALOG_SIZE).set(size as f64);
    if written {
        ::metrics::counter!(CATALOG_WRITES_TOTAL).increment(1);
    }
}

/// Render the current metrics, if a recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the rendered metrics to `path`.
pub fn write_textfile(path: &Path) -> Result<()> {
    let Some(text) = render() else {
        warn!("Metrics recorder not installed, skipping {}", path.display());
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!("Wrote metrics to {}", path.display());
    Ok(())
}
