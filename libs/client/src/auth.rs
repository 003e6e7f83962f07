use afiya_proto::constants::uri;
use afiya_proto::v1::{
    DoctorRegistration, LoginRequest, LoginResponse, RegistrationResponse, UserProfile,
};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error_shape;
use crate::{AfiyaClient, Alert, ClientError};

impl AfiyaClient {
    /// Post outside of the gateway. The caller decides what a failure means,
    /// nothing is notified and a 401 or 403 does not redirect.
    ///
    /// Without `with_token` no `Authorization` header is sent, since a stale
    /// token is rejected by the backend before it looks at the credentials.
    async fn unchecked_post<R: Serialize>(
        &self,
        dest: &str,
        request: &R,
        with_token: bool,
    ) -> Result<(StatusCode, Option<Value>), ClientError> {
        let url = self.endpoint(dest);
        let body = serde_json::to_string(request).map_err(ClientError::JsonEncode)?;
        let csrf_token = self.csrf_for_request(&url)?;
        let auth_token = if with_token {
            self.get_token().await
        } else {
            None
        };
        let headers = self.build_headers(csrf_token.as_deref(), auth_token.as_deref(), &[])?;

        let response = self
            .client
            .post(url.as_str())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        let body: Option<Value> = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(e) => {
                debug!(?e, "failed to read response body");
                None
            }
        };
        Ok((status, body))
    }

    /// Fetch the login page so the backend sets the anti-forgery cookie.
    pub async fn prime_csrf_cookie(&self) -> Result<(), ClientError> {
        let url = self.endpoint(uri::LOGIN_PAGE);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let have_token = self.csrf_token_for(response.url()).is_some();
        debug!(status = %response.status(), have_token, "primed anti-forgery cookie");
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let (status, body) = self
            .unchecked_post(uri::AFIYA_LOGIN, &request, false)
            .await?;

        if !status.is_success() {
            let msg = match body.as_ref() {
                Some(body) => error_shape::extract_with(error_shape::LOGIN_EXTRACTORS, body)
                    .unwrap_or_else(|| "Invalid credentials".to_string()),
                None => format!("Login failed with status: {}", status.as_u16()),
            };
            warn!(%username, status = %status.as_u16(), %msg, "login failed");
            return Err(ClientError::Http(status, msg, body));
        }

        let login: LoginResponse = Self::decode(body)?;
        self.set_token(login.token.clone()).await;
        if self.redirect.cancel().await {
            info!("session restored, pending redirect to login cancelled");
        }
        info!(username = %login.username, "login success");
        Ok(login)
    }

    pub async fn register_doctor(
        &self,
        registration: &DoctorRegistration,
    ) -> Result<RegistrationResponse, ClientError> {
        let (status, body) = self
            .unchecked_post(uri::AFIYA_DOCTORS_REGISTER, registration, false)
            .await?;

        if !status.is_success() {
            let msg = match body.as_ref() {
                Some(body) => {
                    error_shape::extract(body).unwrap_or_else(|| "Registration failed".to_string())
                }
                None => format!("Registration failed with status: {}", status.as_u16()),
            };
            warn!(username = %registration.username, %msg, "registration failed");
            return Err(ClientError::Http(status, msg, body));
        }

        Self::decode(body)
    }

    /// End the session. Whatever the backend says, the local token is dropped
    /// and the user is sent to the login page.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let empty = serde_json::Map::new();
        let result = match self.unchecked_post(uri::API_AUTH_LOGOUT, &empty, true).await {
            Ok((status, _)) if status.is_success() => {
                info!("logout success");
                Ok(())
            }
            Ok((status, body)) => {
                self.notifier.notify(Alert::warning(format!(
                    "Logout request failed (status {}), but redirecting anyway.",
                    status.as_u16()
                )));
                let msg = error_shape::derive_message(status, body.as_ref());
                Err(ClientError::Http(status, msg, body))
            }
            Err(e) => {
                self.notifier.notify(Alert::danger(format!(
                    "Logout failed: {}. Redirecting to login.",
                    e
                )));
                Err(e)
            }
        };

        self.clear_token().await;
        self.redirect.navigate_now(self.login_url.as_str()).await;
        result
    }

    pub async fn whoami(&self) -> Result<UserProfile, ClientError> {
        self.perform_get_request(uri::AFIYA_USER_PROFILE).await
    }
}
