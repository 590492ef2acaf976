pub use self::parser::{BotConfig, Config, DatabaseConfig, DbType, LoggingConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
