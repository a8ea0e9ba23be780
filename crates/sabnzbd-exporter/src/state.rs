//! Shared application state and the global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;

use sabnzbd_exporter_core::exporter::SabnzbdExporter;

pub(crate) const APP_NAME: &str = "sabnzbd-exporter";

pub(crate) struct AppState {
    pub(crate) exporter: SabnzbdExporter,
}

pub(crate) type SharedState = Arc<AppState>;
