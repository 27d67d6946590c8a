use crate::config::{AppConfig, JwtConfig};
use crate::store::{DietStore, MemoryStore, PgStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DietStore>,
    /// Present only when running against Postgres; used for migrations.
    pub db: Option<sqlx::PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.database_url.as_deref() {
            Some(url) => {
                let store = PgStore::connect(url, config.database_max_connections).await?;
                let db = store.pool().clone();
                Ok(Self {
                    config,
                    store: Arc::new(store) as Arc<dyn DietStore>,
                    db: Some(db),
                })
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
                Ok(Self::from_parts(config, Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn DietStore>) -> Self {
        Self {
            config,
            store,
            db: None,
        }
    }

    /// In-memory state with a fixed test signing secret.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            listen_addr: ([127, 0, 0, 1], 0).into(),
            database_url: None,
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
            },
        });
        Self::from_parts(config, Arc::new(MemoryStore::new()))
    }
}
