mod settings;

pub use settings::{
    DatabaseConfig, JwtConfig, LogConfig, NotificationConfig, PushConfig, ServerConfig, Settings,
    UploadConfig,
};
