mod settings;

pub use settings::{OtelConfig, PushConfig, ServerConfig, Settings, VapidConfig};
