pub mod adapter;
pub mod bidders;
pub mod config;
pub mod metrics;
pub mod options;
pub mod products;
pub mod reporter;
pub mod settings;
pub mod testing;
pub mod workflow;

pub use adapter::{
    AdServerAdapter, AdapterCall, AdapterError, CreateKind, CreateRequest, HttpAdServerAdapter,
    LicaConfig, LicaEntry, OrderConfig, OrderConfigError, OrderId, OrderState,
};
pub use bidders::{Bidder, BidderRegistry, BidderSetting};
pub use config::{
    load_config, load_config_from_str, validate_config, AdapterConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig, SettingsConfig,
};
pub use products::{
    AdProduct, AdSize, PayableEvent, ProductError, ProductId, ProductInput, ProductStore,
    SqliteProductStore,
};
pub use reporter::{Notice, NoticeLevel};
pub use settings::{
    FieldType, SettingField, SettingValue, SettingsError, SettingsSection, SettingsStore,
    SqliteSettingsStore,
};
pub use workflow::{
    AttemptState, CompletionCallback, FailureReport, OrderWorkflow, UnrecoverableCallback,
    WorkflowConfig, WorkflowError, WorkflowProgress, WorkflowSnapshot, WorkflowStep,
};
