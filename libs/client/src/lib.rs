#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use afiya_proto::constants::{
    APPLICATION_JSON, CSRF_COOKIE_NAME, CSRF_HEADER, DEFAULT_LOGIN_PATH, DEFAULT_REDIRECT_DELAY,
    TOKEN_AUTH_SCHEME,
};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
pub use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

mod auth;
mod clients;
pub mod dashboard;
pub mod error_shape;
pub mod notify;
mod program;
pub mod redirect;

pub use crate::notify::{Alert, AlertLevel, NotificationArea, Notifier, TracingNotifier};
pub use crate::redirect::{Navigator, RedirectScheduler, TracingNavigator};

#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response - refused, dns, timeout, bad url.
    Transport(reqwest::Error),
    /// A non 2xx response that was not an authentication failure.
    Http(StatusCode, String, Option<Value>),
    /// A 401 or 403. The login redirect has already been scheduled.
    SessionExpired(StatusCode, String),
    MissingCsrfToken,
    JsonEncode(serde_json::Error),
    JsonDecode(serde_json::Error),
    EmptyResponse,
    InvalidInput(String),
    ConfigParseIssue(String),
}

impl ClientError {
    /// The human readable message for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired(..))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(status, _, _) | ClientError::SessionExpired(status, _) => {
                Some(*status)
            }
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "{}", e),
            ClientError::Http(_, msg, _) => write!(f, "{}", msg),
            ClientError::SessionExpired(_, msg) => write!(f, "{}", msg),
            ClientError::MissingCsrfToken => write!(
                f,
                "No anti-forgery token available, the '{}' cookie is not set",
                CSRF_COOKIE_NAME
            ),
            ClientError::JsonEncode(e) => write!(f, "Failed to encode request: {}", e),
            ClientError::JsonDecode(e) => write!(f, "Unexpected response from server: {}", e),
            ClientError::EmptyResponse => write!(f, "Empty response from server"),
            ClientError::InvalidInput(msg) => write!(f, "{}", msg),
            ClientError::ConfigParseIssue(msg) => write!(f, "Invalid client configuration: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            ClientError::JsonEncode(e) | ClientError::JsonDecode(e) => Some(e),
            _ => None,
        }
    }
}

/// What to do when a request is about to go out and there is no anti-forgery
/// cookie to echo back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrfPolicy {
    /// Send the header with an empty value and let the backend decide.
    #[default]
    SendEmpty,
    /// Refuse to send the request.
    FailFast,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct AfiyaClientConfig {
    pub uri: Option<String>,
    pub verify_ca: Option<bool>,
    pub connect_timeout: Option<u64>,
    pub csrf_policy: Option<CsrfPolicy>,
    pub login_path: Option<String>,
    pub redirect_delay_ms: Option<u64>,
}

/// Caller supplied parts of a request. Headers given here are applied after
/// the defaults, so they win - including over the anti-forgery header.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        RequestOptions {
            method,
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<R: Serialize + ?Sized>(self, request: &R) -> Result<Self, ClientError> {
        let body = serde_json::to_string(request).map_err(ClientError::JsonEncode)?;
        Ok(self.body(body))
    }
}

#[derive(Clone)]
pub struct AfiyaClientBuilder {
    address: Option<String>,
    verify_ca: bool,
    connect_timeout: Option<u64>,
    use_system_proxies: bool,
    csrf_policy: CsrfPolicy,
    login_path: String,
    redirect_delay: Duration,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl Display for AfiyaClientBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(value) => writeln!(f, "address: {}", value)?,
            None => writeln!(f, "address: unset")?,
        }
        writeln!(f, "verify_ca: {}", self.verify_ca)?;
        match self.connect_timeout {
            Some(value) => writeln!(f, "connect_timeout: {}", value)?,
            None => writeln!(f, "connect_timeout: unset")?,
        }
        writeln!(f, "use_system_proxies: {}", self.use_system_proxies)?;
        writeln!(f, "csrf_policy: {:?}", self.csrf_policy)?;
        writeln!(f, "login_path: {}", self.login_path)?;
        writeln!(f, "redirect_delay: {:?}", self.redirect_delay)
    }
}

impl fmt::Debug for AfiyaClientBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfiyaClientBuilder")
            .field("address", &self.address)
            .field("verify_ca", &self.verify_ca)
            .field("connect_timeout", &self.connect_timeout)
            .field("use_system_proxies", &self.use_system_proxies)
            .field("csrf_policy", &self.csrf_policy)
            .field("login_path", &self.login_path)
            .field("redirect_delay", &self.redirect_delay)
            .finish_non_exhaustive()
    }
}

impl Default for AfiyaClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AfiyaClientBuilder {
    pub fn new() -> Self {
        AfiyaClientBuilder {
            address: None,
            verify_ca: true,
            connect_timeout: None,
            use_system_proxies: true,
            csrf_policy: CsrfPolicy::default(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(TracingNavigator),
        }
    }

    fn apply_config_options(self, acc: AfiyaClientConfig) -> Self {
        let address = match acc.uri {
            Some(uri) => Some(uri),
            None => {
                debug!("No URI in config supplied to apply_config_options");
                self.address
            }
        };

        AfiyaClientBuilder {
            address,
            verify_ca: acc.verify_ca.unwrap_or(self.verify_ca),
            connect_timeout: acc.connect_timeout.or(self.connect_timeout),
            csrf_policy: acc.csrf_policy.unwrap_or(self.csrf_policy),
            login_path: acc.login_path.unwrap_or(self.login_path),
            redirect_delay: acc
                .redirect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.redirect_delay),
            ..self
        }
    }

    pub fn read_options_from_optional_config<P: AsRef<Path> + std::fmt::Debug>(
        self,
        config_path: P,
    ) -> Result<Self, ClientError> {
        debug!("Attempting to load configuration from {:#?}", &config_path);

        // A missing config file is not an error, the defaults apply.
        if !config_path.as_ref().exists() {
            debug!("{:?} does not exist", config_path);
            return Ok(self);
        };

        let mut f = match File::open(&config_path) {
            Ok(f) => {
                debug!("Successfully opened configuration file {:#?}", &config_path);
                f
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::NotFound => {
                        debug!(
                            "Configuration file {:#?} not found, skipping.",
                            &config_path
                        );
                    }
                    ErrorKind::PermissionDenied => {
                        warn!(
                            "Permission denied loading configuration file {:#?}, skipping.",
                            &config_path
                        );
                    }
                    _ => {
                        debug!(
                            "Unable to open config file {:#?} [{:?}], skipping ...",
                            &config_path, e
                        );
                    }
                };
                return Ok(self);
            }
        };

        let mut contents = String::new();
        f.read_to_string(&mut contents).map_err(|e| {
            error!("{:?}", e);
            ClientError::ConfigParseIssue(format!("{:?}", e))
        })?;

        self.read_options_from_str(&contents)
    }

    pub fn read_options_from_str(self, contents: &str) -> Result<Self, ClientError> {
        let config: AfiyaClientConfig = toml::from_str(contents).map_err(|e| {
            error!("{:?}", e);
            ClientError::ConfigParseIssue(format!("{:?}", e))
        })?;

        Ok(self.apply_config_options(config))
    }

    pub fn address(self, address: String) -> Self {
        AfiyaClientBuilder {
            address: Some(address),
            ..self
        }
    }

    pub fn danger_accept_invalid_certs(self, accept_invalid_certs: bool) -> Self {
        AfiyaClientBuilder {
            // We have to flip the bool state here due to english language.
            verify_ca: !accept_invalid_certs,
            ..self
        }
    }

    pub fn connect_timeout(self, secs: u64) -> Self {
        AfiyaClientBuilder {
            connect_timeout: Some(secs),
            ..self
        }
    }

    pub fn no_proxy(self) -> Self {
        AfiyaClientBuilder {
            use_system_proxies: false,
            ..self
        }
    }

    pub fn csrf_policy(self, csrf_policy: CsrfPolicy) -> Self {
        AfiyaClientBuilder {
            csrf_policy,
            ..self
        }
    }

    pub fn login_path(self, login_path: &str) -> Self {
        AfiyaClientBuilder {
            login_path: login_path.to_string(),
            ..self
        }
    }

    pub fn redirect_delay(self, redirect_delay: Duration) -> Self {
        AfiyaClientBuilder {
            redirect_delay,
            ..self
        }
    }

    /// Where alerts are posted - the shared notification area.
    pub fn notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        AfiyaClientBuilder { notifier, ..self }
    }

    /// What performs the navigation to the login page once a session expires.
    pub fn navigator(self, navigator: Arc<dyn Navigator>) -> Self {
        AfiyaClientBuilder { navigator, ..self }
    }

    fn display_warnings(&self, address: &str) {
        if !self.verify_ca {
            warn!("verify_ca set to false in client configuration - this may allow network interception of passwords!");
        }

        if !address.starts_with("https://") {
            warn!("Address does not start with 'https://' - this may allow network interception of passwords!");
        }
    }

    /// Generates a useragent header based on the package name and version
    pub fn user_agent() -> &'static str {
        static APP_USER_AGENT: &str =
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
        APP_USER_AGENT
    }

    /// Build the client ready for usage.
    pub fn build(self) -> Result<AfiyaClient, ClientError> {
        let address = match &self.address {
            Some(a) => a.trim_end_matches('/').to_string(),
            None => {
                error!("Configuration option 'uri' missing from client configuration, cannot continue client startup without specifying a server to connect to.");
                return Err(ClientError::ConfigParseIssue(
                    "uri is not set".to_string(),
                ));
            }
        };

        self.display_warnings(address.as_str());

        let uri = Url::parse(&address).map_err(|e| {
            error!(?e, "failed to parse address");
            ClientError::ConfigParseIssue(format!("{:?}", e))
        })?;

        let origin = Url::parse(&uri.origin().ascii_serialization()).map_err(|e| {
            error!(?e, "failed to parse origin");
            ClientError::ConfigParseIssue(format!("{:?}", e))
        })?;

        let login_url = Url::parse(&format!("{}/", address))
            .and_then(|base| base.join(&self.login_path))
            .map_err(|e| {
                error!(?e, login_path = %self.login_path, "failed to resolve login page");
                ClientError::ConfigParseIssue(format!("{:?}", e))
            })?;

        let cookie_jar = Arc::new(Jar::default());

        let client_builder = reqwest::Client::builder()
            .user_agent(AfiyaClientBuilder::user_agent())
            .cookie_provider(cookie_jar.clone())
            .danger_accept_invalid_certs(!self.verify_ca);

        let client_builder = match self.use_system_proxies {
            true => client_builder,
            false => client_builder.no_proxy(),
        };

        let client_builder = match &self.connect_timeout {
            Some(secs) => client_builder
                .connect_timeout(Duration::from_secs(*secs))
                .timeout(Duration::from_secs(*secs)),
            None => client_builder,
        };

        let client = client_builder.build().map_err(ClientError::Transport)?;

        let redirect = RedirectScheduler::new(self.navigator.clone());

        Ok(AfiyaClient {
            client,
            addr: address,
            origin,
            login_url,
            cookie_jar,
            auth_token: RwLock::new(None),
            notifier: self.notifier.clone(),
            redirect,
            builder: self,
        })
    }
}

pub struct AfiyaClient {
    pub(crate) client: reqwest::Client,
    pub(crate) addr: String,
    pub(crate) origin: Url,
    pub(crate) login_url: Url,
    pub(crate) builder: AfiyaClientBuilder,
    pub(crate) cookie_jar: Arc<Jar>,
    pub(crate) auth_token: RwLock<Option<String>>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) redirect: RedirectScheduler,
}

impl fmt::Debug for AfiyaClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfiyaClient")
            .field("addr", &self.addr)
            .field("login_url", &self.login_url.as_str())
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl AfiyaClient {
    pub fn get_origin(&self) -> &Url {
        &self.origin
    }

    pub fn get_url(&self) -> &str {
        self.addr.as_str()
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// The absolute url of a backend path.
    pub fn endpoint(&self, dest: &str) -> String {
        format!("{}{}", self.get_url(), dest)
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn redirect_scheduler(&self) -> &RedirectScheduler {
        &self.redirect
    }

    pub async fn set_token(&self, new_token: String) {
        let mut tguard = self.auth_token.write().await;
        *tguard = Some(new_token);
    }

    pub async fn get_token(&self) -> Option<String> {
        let tguard = self.auth_token.read().await;
        (*tguard).as_ref().cloned()
    }

    pub async fn clear_token(&self) {
        let mut tguard = self.auth_token.write().await;
        *tguard = None;
    }

    pub fn new_session(&self) -> Result<Self, ClientError> {
        // Copy our builder, and then just process it.
        let builder = self.builder.clone();
        builder.build()
    }

    /// Put a `Set-Cookie` style value into the cookie store for this backend.
    pub fn add_cookie_str(&self, cookie: &str) {
        self.cookie_jar.add_cookie_str(cookie, &self.origin);
    }

    /// The anti-forgery token the cookie store holds for `url`, read fresh each time.
    pub fn csrf_token_for(&self, url: &Url) -> Option<String> {
        let cookies = self.cookie_jar.cookies(url)?;
        let cookies = cookies.to_str().ok()?;
        cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix(CSRF_COOKIE_NAME)?.strip_prefix('='))
            .map(|raw| match urlencoding::decode(raw) {
                Ok(decoded) => decoded.into_owned(),
                Err(e) => {
                    warn!(?e, "anti-forgery cookie is not valid percent-encoding, using it as is");
                    raw.to_string()
                }
            })
    }

    fn build_headers(
        &self,
        csrf_token: Option<&str>,
        auth_token: Option<&str>,
        overrides: &[(String, String)],
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

        let csrf_value = match csrf_token.map(HeaderValue::from_str) {
            Some(Ok(hv)) => hv,
            Some(Err(e)) => {
                warn!(?e, "anti-forgery token is not a valid header value, sending empty");
                HeaderValue::from_static("")
            }
            None => HeaderValue::from_static(""),
        };
        headers.insert(HeaderName::from_static("x-csrftoken"), csrf_value);

        if let Some(token) = auth_token {
            let hv = HeaderValue::from_str(&format!("{} {}", TOKEN_AUTH_SCHEME, token))
                .map_err(|e| {
                    error!(?e, "auth token is not a valid header value");
                    ClientError::InvalidInput("Stored auth token is not valid".to_string())
                })?;
            headers.insert(AUTHORIZATION, hv);
        }

        for (name, value) in overrides {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                error!(?e, %name, "invalid header name");
                ClientError::InvalidInput(format!("Invalid header name: {}", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                error!(?e, %name, "invalid header value");
                ClientError::InvalidInput(format!("Invalid value for header {}", name))
            })?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Read the anti-forgery token for `url`, applying the configured policy
    /// when there is none.
    fn csrf_for_request(&self, url: &str) -> Result<Option<String>, ClientError> {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                // The transport will report this properly.
                debug!(?e, %url, "unable to parse request url, not consulting cookies");
                return Ok(None);
            }
        };

        match self.csrf_token_for(&parsed) {
            Some(token) => Ok(Some(token)),
            None => match self.builder.csrf_policy {
                CsrfPolicy::SendEmpty => {
                    warn!(%url, "no {} cookie, sending empty {}", CSRF_COOKIE_NAME, CSRF_HEADER);
                    Ok(None)
                }
                CsrfPolicy::FailFast => {
                    error!(%url, "no {} cookie, refusing to send request", CSRF_COOKIE_NAME);
                    Err(ClientError::MissingCsrfToken)
                }
            },
        }
    }

    /// Send a request to the backend.
    ///
    /// Returns the parsed JSON body, or `None` for a 204 or a body that is not
    /// JSON. Every failure is posted to the notifier once before it is
    /// returned. A 401 or 403 posts the session expiry warning instead and
    /// schedules the redirect to the login page.
    pub async fn send(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ClientError> {
        match self.dispatch(url, options).await {
            Ok(body) => Ok(body),
            Err(e) => {
                error!(?e, %url, "API request error");
                let msg = e.message();
                if !e.is_session_expired() && !error_shape::indicates_session_expiry(&msg) {
                    let msg = if msg.is_empty() {
                        "Unknown error".to_string()
                    } else {
                        msg
                    };
                    self.notifier
                        .notify(Alert::danger(format!("API Request Failed: {}", msg)));
                }
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ClientError> {
        let RequestOptions {
            method,
            headers: overrides,
            body,
        } = options;

        let csrf_token = self.csrf_for_request(url)?;
        let auth_token = self.get_token().await;
        let headers = self.build_headers(csrf_token.as_deref(), auth_token.as_deref(), &overrides)?;

        debug!(%method, %url, csrf_present = csrf_token.is_some(), "apiRequest");

        let request = self.client.request(method, url).headers(headers);
        let request = match body {
            Some(body) => request.body(body),
            None => request,
        };

        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body: Option<Value> = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| debug!(?e, "response body is not json, treating as empty"))
                .ok(),
            Err(e) => {
                debug!(?e, "failed to read response body, treating as empty");
                None
            }
        };

        if status.is_success() {
            return Ok(body);
        }

        let message = error_shape::derive_message(status, body.as_ref());
        error!(status = %status.as_u16(), ?body, "API error data");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = error_shape::session_expired_message(&message);
            self.notifier.notify(Alert::warning(message.clone()));
            self.redirect
                .schedule(self.login_url.as_str(), self.builder.redirect_delay)
                .await;
            return Err(ClientError::SessionExpired(status, message));
        }

        Err(ClientError::Http(status, message, body))
    }

    fn decode<T: DeserializeOwned>(body: Option<Value>) -> Result<T, ClientError> {
        let value = body.unwrap_or(Value::Null);
        let was_null = value.is_null();
        serde_json::from_value(value).map_err(|e| {
            if was_null {
                ClientError::EmptyResponse
            } else {
                error!(?e, "failed to decode response");
                ClientError::JsonDecode(e)
            }
        })
    }

    pub(crate) async fn perform_get_request<T: DeserializeOwned>(
        &self,
        dest: &str,
    ) -> Result<T, ClientError> {
        let body = self
            .send(&self.endpoint(dest), RequestOptions::default())
            .await?;
        Self::decode(body)
    }

    pub(crate) async fn perform_post_request<R: Serialize, T: DeserializeOwned>(
        &self,
        dest: &str,
        request: &R,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::new(Method::POST).json(request)?;
        let body = self.send(&self.endpoint(dest), options).await?;
        Self::decode(body)
    }

    pub(crate) async fn perform_patch_request<R: Serialize, T: DeserializeOwned>(
        &self,
        dest: &str,
        request: &R,
    ) -> Result<T, ClientError> {
        let options = RequestOptions::new(Method::PATCH).json(request)?;
        let body = self.send(&self.endpoint(dest), options).await?;
        Self::decode(body)
    }
}
