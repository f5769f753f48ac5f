use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Conventional variable holding the BotFather token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Conventional variable holding the operator's Telegram user id.
pub const USER_ID_ENV: &str = "TELEGRAM_USER_ID";

/// Bot credential. Zeroized on drop and never printed.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken([REDACTED])")
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Token from BotFather (required)
    #[serde(default)]
    pub bot_token: BotToken,
    /// The single operator allowed to use the bot
    #[serde(default)]
    pub allowed_user_id: Option<i64>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Long-polling timeout for getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    60
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: BotToken::default(),
            allowed_user_id: None,
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// External program producing one kind of config.
///
/// The client name is appended after `args`, so `program = "sudo"` with
/// `args = ["/usr/local/bin/gen_openvpn_config.sh"]` works as expected.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct GeneratorCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl GeneratorCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Generator scripts and the directories they write into
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_openvpn_command")]
    pub openvpn: GeneratorCommand,
    #[serde(default = "default_wireguard_command")]
    pub wireguard: GeneratorCommand,
    #[serde(default = "default_openvpn_dir")]
    pub openvpn_dir: PathBuf,
    #[serde(default = "default_wireguard_dir")]
    pub wireguard_dir: PathBuf,
    /// Kill the generator after this many seconds. Unset means wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_openvpn_command() -> GeneratorCommand {
    GeneratorCommand::new("/usr/local/bin/gen_openvpn_config.sh")
}

fn default_wireguard_command() -> GeneratorCommand {
    GeneratorCommand::new("/usr/local/bin/gen_wireguard_config.sh")
}

fn default_openvpn_dir() -> PathBuf {
    PathBuf::from("/tmp/openvpn_configs")
}

fn default_wireguard_dir() -> PathBuf {
    PathBuf::from("/tmp/wireguard_configs")
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            openvpn: default_openvpn_command(),
            wireguard: default_wireguard_command(),
            openvpn_dir: default_openvpn_dir(),
            wireguard_dir: default_wireguard_dir(),
            timeout_secs: None,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Session loop behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Events handled at once; 1 keeps strict arrival order
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,
    /// Accept a VPN choice only after /get_vpn showed the menu
    #[serde(default)]
    pub require_menu: bool,
    /// How long a shown menu stays valid when `require_menu` is set
    #[serde(default = "default_menu_ttl")]
    pub menu_ttl_secs: u64,
}

fn default_max_concurrent_events() -> usize {
    1
}

fn default_menu_ttl() -> u64 {
    300
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            max_concurrent_events: default_max_concurrent_events(),
            require_menu: false,
            menu_ttl_secs: default_menu_ttl(),
        }
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables
            .add_source(Self::environment())
            .set_override_option("telegram.bot_token", non_empty_env(TOKEN_ENV))?
            .set_override_option("telegram.allowed_user_id", non_empty_env(USER_ID_ENV))?;

        Self::from_builder(builder)
    }

    /// `VPNBOT_` prefix, `__` between nesting levels,
    /// e.g. VPNBOT_GENERATOR__TIMEOUT_SECS or VPNBOT_BOT__REQUIRE_MENU
    fn environment() -> Environment {
        Environment::with_prefix("VPNBOT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Build, deserialize and validate
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bot cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Message(format!(
                "{} environment variable not set",
                TOKEN_ENV
            )));
        }
        if self.bot.max_concurrent_events == 0 {
            return Err(ConfigError::Message(
                "bot.max_concurrent_events must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl TelegramConfig {
    /// URL of a Bot API method, e.g. `https://api.telegram.org/bot<token>/getMe`
    pub fn method_url(&self, method: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let method = method.trim_start_matches('/');
        format!("{}/bot{}/{}", base, self.bot_token.expose(), method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder<DefaultState> {
        Config::builder()
    }

    #[test]
    fn test_method_url() {
        let config = TelegramConfig {
            bot_token: BotToken::new("123:abc"),
            api_url: "https://api.telegram.org/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.method_url("/getMe"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
        assert_eq!(
            config.method_url("sendDocument"),
            "https://api.telegram.org/bot123:abc/sendDocument"
        );
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = AppConfig::from_builder(builder()).unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn test_defaults_match_generator_layout() {
        let config = AppConfig::from_builder(
            builder()
                .set_override("telegram.bot_token", "123:abc")
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.telegram.allowed_user_id, None);
        assert_eq!(config.telegram.poll_timeout_secs, 60);
        assert_eq!(config.generator.openvpn_dir, PathBuf::from("/tmp/openvpn_configs"));
        assert_eq!(
            config.generator.wireguard_dir,
            PathBuf::from("/tmp/wireguard_configs")
        );
        assert_eq!(
            config.generator.wireguard.program,
            PathBuf::from("/usr/local/bin/gen_wireguard_config.sh")
        );
        assert!(config.generator.timeout().is_none());
        assert_eq!(config.bot.max_concurrent_events, 1);
        assert!(!config.bot.require_menu);
    }

    #[test]
    fn test_user_id_parsed_from_string() {
        let config = AppConfig::from_builder(
            builder()
                .set_override("telegram.bot_token", "123:abc")
                .unwrap()
                .set_override("telegram.allowed_user_id", "42")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(config.telegram.allowed_user_id, Some(42));
    }

    #[test]
    fn test_malformed_user_id_is_rejected() {
        let result = AppConfig::from_builder(
            builder()
                .set_override("telegram.bot_token", "123:abc")
                .unwrap()
                .set_override("telegram.allowed_user_id", "not-a-number")
                .unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let vars = config::Map::from([
            ("VPNBOT_TELEGRAM__BOT_TOKEN".to_string(), "123:abc".to_string()),
            ("VPNBOT_GENERATOR__TIMEOUT_SECS".to_string(), "120".to_string()),
            ("VPNBOT_BOT__REQUIRE_MENU".to_string(), "true".to_string()),
            // Missing the single underscore after the prefix
            ("VPNBOTBOT__MAX_CONCURRENT_EVENTS".to_string(), "8".to_string()),
        ]);
        let config = AppConfig::from_builder(
            builder().add_source(AppConfig::environment().source(Some(vars))),
        )
        .unwrap();

        assert_eq!(config.telegram.bot_token.expose(), "123:abc");
        assert_eq!(config.generator.timeout(), Some(Duration::from_secs(120)));
        assert!(config.bot.require_menu);
        assert_eq!(config.bot.max_concurrent_events, 1);
    }

    #[test]
    fn test_token_is_redacted() {
        let token = BotToken::new("123:secret");
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
