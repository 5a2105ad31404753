use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::controller::FeedController;
use crate::app::error::{FeedTipsError, Result};
use crate::config::Config;
use crate::records::RecordStore;
use crate::store::{EventLog, MemoryStore, RecordBackend, SqliteStore};
use crate::tips::{catalog, TipEngine};

pub struct AppContext {
    pub records: Arc<RecordStore>,
    pub tips: Arc<TipEngine>,
    pub config: Config,
}

impl AppContext {
    /// Open the configured store and start both components.
    ///
    /// Failing to open the database is fatal and reported as
    /// [`FeedTipsError::PersistenceUnavailable`].
    pub fn new(config: Config) -> Result<Self> {
        if config.store.in_memory {
            return Self::with_backend(config, Arc::new(MemoryStore::new()));
        }

        let db_path = match config.store.path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = SqliteStore::new(&db_path).map_err(|e| {
            FeedTipsError::PersistenceUnavailable(format!("{}: {}", db_path.display(), e))
        })?;
        info!(path = %db_path.display(), "Opened item store");

        Self::with_backend(config, Arc::new(store))
    }

    pub fn in_memory() -> Result<Self> {
        let mut config = Config::default();
        config.store.in_memory = true;
        Self::new(config)
    }

    fn with_backend<B>(config: Config, backend: Arc<B>) -> Result<Self>
    where
        B: RecordBackend + EventLog + 'static,
    {
        let records = Arc::new(RecordStore::new(backend.clone())?);
        let tips = Arc::new(TipEngine::new(
            catalog::feed_tips()?,
            backend,
            config.tips.display_frequency,
        )?);

        if config.tips.reset_on_launch {
            if let Err(e) = tips.reset_all() {
                warn!(error = %e, "Failed to reset tip datastore");
            }
        }

        // The environment flag is written exactly once, here
        let is_pro = config.environment.is_pro;
        for tip in tips.catalog().iter() {
            if tip.parameter_decl(catalog::IS_PRO).is_some() {
                tips.set_parameter(&tip.id, catalog::IS_PRO, is_pro)?;
            }
        }

        Ok(Self {
            records,
            tips,
            config,
        })
    }

    pub fn controller(&self) -> FeedController {
        FeedController::new(self.records.clone(), self.tips.clone())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FeedTipsError::Config("Could not find data directory".into()))?;
        let feedtips_dir = data_dir.join("feedtips");
        std::fs::create_dir_all(&feedtips_dir)?;
        Ok(feedtips_dir.join("feedtips.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tips::ParamValue;

    #[test]
    fn test_in_memory_context_applies_is_pro() {
        let ctx = AppContext::in_memory().unwrap();
        assert_eq!(
            ctx.tips.parameter(catalog::ADD, catalog::IS_PRO),
            Some(ParamValue::Bool(true))
        );
        assert!(ctx.tips.is_eligible(catalog::ADD));
    }

    #[test]
    fn test_is_pro_disabled_hides_tips() {
        let mut config = Config::default();
        config.store.in_memory = true;
        config.environment.is_pro = false;

        let ctx = AppContext::new(config).unwrap();
        for tip in ctx.tips.catalog().iter() {
            assert!(!ctx.tips.is_eligible(&tip.id));
        }
    }

    #[test]
    fn test_unopenable_database_is_persistence_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        // A directory cannot be opened as a database file
        config.store.path = Some(dir.path().to_path_buf());

        assert!(matches!(
            AppContext::new(config),
            Err(FeedTipsError::PersistenceUnavailable(_))
        ));
    }

    #[test]
    fn test_reset_on_launch_clears_donations() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.path = Some(dir.path().join("feedtips.db"));

        {
            let ctx = AppContext::new(config.clone()).unwrap();
            ctx.tips.donate(catalog::ITEM_ADDED);
        }
        {
            let ctx = AppContext::new(config.clone()).unwrap();
            assert_eq!(ctx.tips.donation_count(catalog::ITEM_ADDED), 1);
        }

        config.tips.reset_on_launch = true;
        let ctx = AppContext::new(config).unwrap();
        assert_eq!(ctx.tips.donation_count(catalog::ITEM_ADDED), 0);
    }
}
