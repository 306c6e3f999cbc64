pub mod config;
pub mod metrics;
pub mod pokeapi;
pub mod pokemon;
pub mod store;
pub mod sync;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, ApiConfig, Config, ConfigError,
    DatabaseConfig, ServerConfig, SyncConfig,
};
pub use pokeapi::{FetchError, Fetcher, HttpFetcher};
pub use pokemon::{
    CatalogEntry, NextDownload, PokemonDetails, PokemonRecord, PokemonType, StatEntry, StatKind,
    TypeEntry,
};
pub use store::{
    RecordStore, ResumeState, ResumeStore, SqliteRecordStore, SqliteResumeStore, StoreChange,
    StoreError,
};
pub use sync::{
    create_sync_system, SyncController, SyncError, SyncEvent, SyncHandle, SyncOperation,
    SyncOptions, SyncStatus,
};
