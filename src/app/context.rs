use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::app::error::{GuardError, Result};
use crate::background::{spawn_background_service, BackgroundHandle, ComplianceChecker, MessageRouter};
use crate::compliance::{ComplianceService, LocalComplianceService, RemoteComplianceClient};
use crate::config::Config;
use crate::content::ContentScript;
use crate::domain::ExtensionSettings;
use crate::relay::{ChannelTransport, DirectTransport, Relay, COMPLIANCE_CHECKER};
use crate::scraper::{ChromePageSource, HttpPageSource, ListingObserver, PageSource};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Wires the pipeline together. Must be built inside a tokio runtime,
/// since it spawns the background service.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub compliance: Arc<dyn ComplianceService>,
    pub router: Arc<MessageRouter>,
    pub background: BackgroundHandle,
    pub relay: Arc<Relay>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.store.path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::with_retention(
            &db_path,
            config.store.max_scan_records,
        )?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory_with_retention(
            config.store.max_scan_records,
        )?);
        Self::with_store(config, store)
    }

    fn with_store(mut config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let compliance: Arc<dyn ComplianceService> = if config.api.enabled {
            // The relay must outwait the client's retries, or the mock
            // report never reaches the page
            config.relay = config.relay.clone().covering(config.api.worst_case());
            Arc::new(RemoteComplianceClient::from_config(config.api.clone())?)
        } else {
            info!("Scoring service disabled, classifying locally");
            Arc::new(LocalComplianceService)
        };

        let checker = ComplianceChecker::new(compliance.clone(), store.clone());
        let router = Arc::new(MessageRouter::new().with_handler(COMPLIANCE_CHECKER, Arc::new(checker)));
        let background = spawn_background_service(router.clone(), config.relay.queue_capacity);

        let relay = Relay::new(
            Arc::new(ChannelTransport::new(background.clone())),
            config.relay.clone(),
        )
        .with_fallback(Arc::new(DirectTransport::new(router.clone())));

        Ok(Self {
            config,
            store,
            compliance,
            router,
            background,
            relay: Arc::new(relay),
        })
    }

    pub fn content_script(&self) -> ContentScript {
        ContentScript::new(
            self.relay.clone(),
            self.store.clone(),
            ListingObserver::from_config(&self.config.scraper),
        )
    }

    /// Plain HTTP, or a headless Chrome when `chrome` is set
    pub async fn page_source(&self, chrome: bool) -> Result<Box<dyn PageSource>> {
        if chrome {
            Ok(Box::new(ChromePageSource::new(self.config.scraper.clone()).await?))
        } else {
            Ok(Box::new(HttpPageSource::new(&self.config.scraper)?))
        }
    }

    pub fn settings(&self) -> Result<ExtensionSettings> {
        self.store.get_settings()
    }

    pub async fn shutdown(&self) {
        self.background.shutdown().await;
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GuardError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("ecomguard");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("ecomguard.db"))
    }
}
