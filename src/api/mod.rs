use std::sync::Arc;

use crate::persistence::settings::AppSettings;

pub mod generator;
pub mod memory;
pub mod store;
pub mod sync;
pub mod worker;

// Network clients are feature-gated. Builds without `remote` run offline only.
#[cfg(feature = "remote")]
pub mod http;

use generator::{ContentGenerator, OfflineGenerator};
use memory::MemoryStore;
use store::TreeStore;

pub struct Backend {
    pub store: Arc<dyn TreeStore>,
    pub generator: Arc<dyn ContentGenerator>,
    /// Human readable description for the status bar.
    pub describe: String,
}

/// Remote store when a base url is configured, otherwise an in-memory one.
pub fn backend_from_settings(settings: &AppSettings) -> anyhow::Result<Backend> {
    #[cfg(feature = "remote")]
    {
        if let Some(client) = http::HttpBackend::from_settings(settings)? {
            let client = Arc::new(client);
            return Ok(Backend {
                store: client.clone(),
                generator: client,
                describe: settings.store_base_url.clone().unwrap_or_default(),
            });
        }
    }
    #[cfg(not(feature = "remote"))]
    {
        if settings.store_base_url.is_some() {
            log::warn!("store_base_url is set but this build has no `remote` feature; running offline");
        }
    }
    Ok(offline_backend())
}

pub fn offline_backend() -> Backend {
    Backend {
        store: Arc::new(MemoryStore::new()),
        generator: Arc::new(OfflineGenerator),
        describe: "offline (in-memory)".to_string(),
    }
}
