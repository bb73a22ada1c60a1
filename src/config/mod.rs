mod settings;

pub use settings::{
    LLMConfig, LoggingConfig, RelayMode, ServerConfig, SessionConfig, Settings, StoreConfig,
};
