//! Service wiring: store, token issuer and the external collaborators the
//! handlers talk to.

use std::sync::Arc;

use chrono::Duration;

use devcamper_auth::Hs256Jwt;
use devcamper_core::{Collection, Document, ResourceId};
use devcamper_infra::mailer::{ConsoleMailer, mailer_from_config};
use devcamper_infra::{
    AppConfig, Geocoder, InMemoryResourceStore, MailError, Mailer, MapQuestGeocoder, PhotoStorage,
    PostgresResourceStore, ResourceStore, StaticGeocoder, StoreError,
};

use crate::app::errors::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("failed to open the document store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to set up the mailer: {0}")]
    Mail(#[from] MailError),
}

#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn ResourceStore>,
    pub jwt: Arc<Hs256Jwt>,
    pub mailer: Arc<dyn Mailer>,
    pub geocoder: Arc<dyn Geocoder>,
    pub photos: PhotoStorage,
    pub config: AppConfig,
}

impl AppServices {
    /// Wire everything from configuration: Postgres when `DATABASE_URL` is
    /// set, SMTP when a host is set, MapQuest when an API key is set.
    pub async fn from_config(config: AppConfig) -> Result<Self, ServicesError> {
        let store = open_store(&config).await?;
        let mailer: Arc<dyn Mailer> = Arc::from(mailer_from_config(&config.mail)?);
        let mut services = Self::new(config, store);
        services.mailer = mailer;
        services.geocoder = geocoder_from_config(&services.config);
        Ok(services)
    }

    /// In-memory store, console mailer and an empty geocoder.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(InMemoryResourceStore::new()))
    }

    fn new(config: AppConfig, store: Arc<dyn ResourceStore>) -> Self {
        let jwt = Hs256Jwt::new(
            config.auth.jwt_secret.as_bytes(),
            Duration::days(config.auth.jwt_expire_days),
        );
        Self {
            store,
            jwt: Arc::new(jwt),
            mailer: Arc::new(ConsoleMailer),
            geocoder: Arc::new(StaticGeocoder::new()),
            photos: PhotoStorage::new(&config.uploads),
            config,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Load a document or fail with the collection's not-found error.
    pub async fn load(&self, collection: Collection, id: ResourceId) -> Result<Document, ApiError> {
        self.store
            .get(collection, id)
            .await?
            .ok_or_else(|| ApiError::not_found(collection, id))
    }

    /// Write back a changed document that is known to exist.
    pub async fn save(&self, collection: Collection, doc: Document) -> Result<Document, ApiError> {
        let id = doc.id();
        self.store
            .replace(collection, doc)
            .await?
            .ok_or_else(|| ApiError::not_found(collection, id))
    }
}

/// Postgres when configured, otherwise an empty in-memory store.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn ResourceStore>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresResourceStore::connect(url).await?;
            tracing::info!("using postgres document store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory document store");
            Ok(Arc::new(InMemoryResourceStore::new()))
        }
    }
}

pub fn geocoder_from_config(config: &AppConfig) -> Arc<dyn Geocoder> {
    match &config.geocoder_api_key {
        Some(key) => Arc::new(MapQuestGeocoder::new(key.clone())),
        None => {
            tracing::warn!("GEOCODER_API_KEY not set; addresses will not be geocoded");
            Arc::new(StaticGeocoder::new())
        }
    }
}
