use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use afiya_client::{AfiyaClient, AfiyaClientBuilder, Alert, AlertLevel, ClientError, Navigator, Notifier};
use afiya_proto::constants::{
    DEFAULT_CLIENT_CONFIG_PATH, DEFAULT_CLIENT_CONFIG_PATH_HOME, DEFAULT_SERVER_ADDRESS,
};

use crate::session::{forget_token, read_tokens};
use crate::CommonOpt;

/// Prints alerts for the user on stderr, leaving stdout for command output.
pub struct CliNotifier;

impl Notifier for CliNotifier {
    fn notify(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Success | AlertLevel::Info => eprintln!("{}", alert.message),
            AlertLevel::Warning => eprintln!("Warning: {}", alert.message),
            AlertLevel::Danger => eprintln!("Error: {}", alert.message),
        }
    }
}

/// There is no login page to go to, so an ended session drops the cached
/// token and tells the user how to start a new one.
pub struct CliNavigator {
    instance: String,
    token_cache_path: String,
}

impl Navigator for CliNavigator {
    fn navigate(&self, target: &str) {
        debug!(%target, "session ended");
        if forget_token(&self.instance, &self.token_cache_path).is_err() {
            warn!("Unable to remove the cached session for {}", self.instance);
        }
        eprintln!("Your session has ended. Run `afiya login` to sign in again.");
    }
}

impl CommonOpt {
    pub fn get_token_cache_path(&self) -> String {
        match self.token_cache_path.clone() {
            None => afiya_proto::constants::CLIENT_TOKEN_CACHE.to_string(),
            Some(val) => val,
        }
    }

    pub fn to_unauth_client(&self) -> AfiyaClient {
        let config_path: String = shellexpand::tilde(DEFAULT_CLIENT_CONFIG_PATH_HOME).into_owned();

        let client_builder = AfiyaClientBuilder::new()
            .address(DEFAULT_SERVER_ADDRESS.to_string())
            .read_options_from_optional_config(DEFAULT_CLIENT_CONFIG_PATH)
            .map_err(|e| {
                error!(
                    "Failed to parse config ({:?}) -- {:?}",
                    DEFAULT_CLIENT_CONFIG_PATH, e
                );
                e
            })
            .and_then(|cb| {
                cb.read_options_from_optional_config(&config_path)
                    .map_err(|e| {
                        error!("Failed to parse config ({:?}) -- {:?}", config_path, e);
                        e
                    })
            })
            .unwrap_or_else(|_e| {
                std::process::exit(1);
            });
        debug!(
            "Successfully loaded configuration, looked in {} and {} - client builder state: {:?}",
            DEFAULT_CLIENT_CONFIG_PATH, DEFAULT_CLIENT_CONFIG_PATH_HOME, &client_builder
        );

        let client_builder = match &self.addr {
            Some(a) => client_builder.address(a.to_string()),
            None => client_builder,
        };

        // Build once to learn the instance address the navigator must clear.
        let instance = client_builder
            .clone()
            .build()
            .map(|c| c.get_url().to_string())
            .unwrap_or_else(|e| {
                error!("Failed to build client instance -- {:?}", e);
                std::process::exit(1);
            });

        client_builder
            .notifier(Arc::new(CliNotifier))
            .navigator(Arc::new(CliNavigator {
                instance,
                token_cache_path: self.get_token_cache_path(),
            }))
            // Nobody is watching a page, go straight away.
            .redirect_delay(Duration::ZERO)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build client instance -- {:?}", e);
                std::process::exit(1);
            })
    }

    /// A client carrying the cached session for this instance.
    pub async fn to_client(&self) -> AfiyaClient {
        let client = self.to_unauth_client();

        let tokens = match read_tokens(&self.get_token_cache_path()) {
            Ok(t) => t,
            Err(_e) => {
                error!("Error retrieving authentication token store");
                std::process::exit(1);
            }
        };

        match tokens.get(client.get_url()) {
            Some(token) => {
                debug!("Using cached token for {}", client.get_url());
                client.set_token(token.clone()).await;
            }
            None => {
                error!(
                    "No session found for {}. Please login with the 'login' subcommand.",
                    client.get_url()
                );
                std::process::exit(1);
            }
        }

        if let Err(e) = client.prime_csrf_cookie().await {
            warn!(?e, "Unable to fetch anti-forgery cookie");
        }

        client
    }
}

/// Report a failed command. When the session ended, let the pending
/// navigation finish before the process exits.
pub async fn report_error(client: &AfiyaClient, e: ClientError) -> ExitCode {
    if e.is_session_expired() {
        client.redirect_scheduler().wait().await;
    } else {
        error!("{}", e);
    }
    ExitCode::FAILURE
}
