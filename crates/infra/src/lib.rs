//! Infrastructure layer: document stores, config, external services.

pub mod config;
pub mod geocoder;
pub mod mailer;
pub mod seed;
pub mod store;
pub mod uploads;

pub use config::{AppConfig, ConfigError};
pub use geocoder::{Geocoder, MapQuestGeocoder, StaticGeocoder};
pub use mailer::{EmailMessage, MailError, Mailer};
pub use store::{FindOptions, InMemoryResourceStore, PostgresResourceStore, ResourceStore, StoreError};
pub use uploads::{PhotoStorage, StagedPhoto, UploadError};
