//! Because consistency is great!
//!
pub mod uri;

use std::time::Duration;

/// The default location for the `afiya` CLI tool's token cache.
pub const CLIENT_TOKEN_CACHE: &str = "~/.cache/afiya_tokens";

/// The "system" path for Afiya client config
pub const DEFAULT_CLIENT_CONFIG_PATH: &str = "/etc/afiya/config";
/// The user-owned path for Afiya client config
pub const DEFAULT_CLIENT_CONFIG_PATH_HOME: &str = "~/.config/afiya";

/// The hosted clinic backend, used when no address is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "https://juma-afiya-system.onrender.com";

pub const APPLICATION_JSON: &str = "application/json";

/// Cookie the backend issues holding the anti-forgery token.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";
/// Header the anti-forgery token is echoed back in.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// DRF token authentication scheme, sent as `Authorization: Token <key>`.
pub const TOKEN_AUTH_SCHEME: &str = "Token";

/// Where a session expiry sends the user, relative to the backend address.
pub const DEFAULT_LOGIN_PATH: &str = "login.html";

/// How long the session expiry notice stays up before navigating away.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
