use std::collections::BTreeMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::PathBuf;
use std::process::ExitCode;

use afiya_proto::v1::DoctorRegistration;

use crate::common::report_error;
use crate::{password_prompt, CommonOpt, LoginOpt, LogoutOpt, RegisterOpt};

/// Cached session tokens, keyed by the instance address they belong to.
pub type TokenStore = BTreeMap<String, String>;

#[allow(clippy::result_unit_err)]
pub fn read_tokens(token_path: &str) -> Result<TokenStore, ()> {
    let token_path = PathBuf::from(shellexpand::tilde(token_path).into_owned());
    if !token_path.exists() {
        debug!(
            "Token cache file path {:?} does not exist, returning an empty token store.",
            token_path
        );
        return Ok(Default::default());
    }

    debug!("Attempting to read tokens from {:?}", &token_path);
    let file = match File::open(&token_path) {
        Ok(f) => f,
        Err(e) => {
            match e.kind() {
                ErrorKind::PermissionDenied => {
                    // we bail here because you won't be able to write them back...
                    error!(
                        "Permission denied reading token store file {:?}",
                        &token_path
                    );
                    return Err(());
                }
                // other errors are OK to continue past
                _ => {
                    warn!(
                        "Cannot read tokens from {} due to error: {:?} ... continuing.",
                        token_path.display(),
                        e
                    );
                    return Ok(Default::default());
                }
            };
        }
    };
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|e| {
        warn!(
            "JSON/IO error reading tokens from {:?} -> {:?}",
            &token_path, e
        );
    })
}

#[allow(clippy::result_unit_err)]
pub fn write_tokens(tokens: &TokenStore, token_path: &str) -> Result<(), ()> {
    let token_path = PathBuf::from(shellexpand::tilde(token_path).into_owned());

    if let Some(token_dir) = token_path.parent() {
        if !token_dir.as_os_str().is_empty() && !token_dir.exists() {
            create_dir_all(token_dir).map_err(|e| {
                error!(
                    "Unable to create directory - {} {:?}",
                    token_dir.display(),
                    e
                );
            })?;
        }
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // Take away group/everyone read/write
    #[cfg(target_family = "unix")]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(&token_path).map_err(|e| {
        error!("Can not write to {} -> {:?}", token_path.display(), e);
    })?;

    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, tokens).map_err(|e| {
        error!(
            "JSON/IO error writing tokens to file {:?} -> {:?}",
            &token_path, e
        );
    })
}

/// Drop the cached token for an instance, if there is one.
#[allow(clippy::result_unit_err)]
pub fn forget_token(instance: &str, token_path: &str) -> Result<bool, ()> {
    let mut tokens = read_tokens(token_path)?;
    if tokens.remove(instance).is_some() {
        write_tokens(&tokens, token_path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

impl LoginOpt {
    pub fn debug(&self) -> bool {
        self.copt.debug
    }

    pub async fn exec(&self) -> ExitCode {
        let client = self.copt.to_unauth_client();

        if let Err(e) = client.prime_csrf_cookie().await {
            error!("Unable to reach {} -- {}", client.get_url(), e);
            return ExitCode::FAILURE;
        }

        let password = match &self.password {
            Some(password) => {
                trace!("User provided password directly, don't need to prompt.");
                password.to_owned()
            }
            None => match rpassword::prompt_password("Enter password: ") {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to create password prompt -- {:?}", e);
                    return ExitCode::FAILURE;
                }
            },
        };

        let login = match client.login(&self.username, &password).await {
            Ok(login) => login,
            Err(e) => {
                error!("Login failed: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let token_path = self.copt.get_token_cache_path();
        let mut tokens = match read_tokens(&token_path) {
            Ok(t) => t,
            Err(_e) => {
                error!("Error retrieving authentication token store");
                return ExitCode::FAILURE;
            }
        };
        tokens.insert(client.get_url().to_string(), login.token);

        if write_tokens(&tokens, &token_path).is_err() {
            error!("Error persisting authentication token store");
            return ExitCode::FAILURE;
        }

        println!("Login Success for {}", login.username);
        ExitCode::SUCCESS
    }
}

impl LogoutOpt {
    pub fn debug(&self) -> bool {
        self.copt.debug
    }

    pub async fn exec(&self) -> ExitCode {
        let token_path = self.copt.get_token_cache_path();

        if self.local_only {
            let instance = self.copt.to_unauth_client().get_url().to_string();
            return match forget_token(&instance, &token_path) {
                Ok(true) => {
                    println!("Removed session for {}", instance);
                    ExitCode::SUCCESS
                }
                Ok(false) => {
                    println!("No session to remove for {}", instance);
                    ExitCode::SUCCESS
                }
                Err(_e) => {
                    error!("Error updating authentication token store");
                    ExitCode::FAILURE
                }
            };
        }

        // The navigator removes the cached token once the client is done.
        let client = self.copt.to_client().await;
        match client.logout().await {
            Ok(()) => {
                println!("Logged out of {}", client.get_url());
                ExitCode::SUCCESS
            }
            Err(e) => {
                debug!(?e, "logout request failed, session removed anyway");
                ExitCode::FAILURE
            }
        }
    }
}

impl RegisterOpt {
    pub fn debug(&self) -> bool {
        self.copt.debug
    }

    pub async fn exec(&self) -> ExitCode {
        let client = self.copt.to_unauth_client();

        if let Err(e) = client.prime_csrf_cookie().await {
            error!("Unable to reach {} -- {}", client.get_url(), e);
            return ExitCode::FAILURE;
        }

        let password = match password_prompt("Enter a password for the new account: ") {
            Some(p) => p,
            None => {
                error!("No password was set");
                return ExitCode::FAILURE;
            }
        };

        let registration = DoctorRegistration {
            username: self.username.clone(),
            password,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        };

        match client.register_doctor(&registration).await {
            Ok(resp) => {
                println!("{}", resp.message);
                println!("Run `afiya login -u {}` to sign in.", self.username);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Registration failed: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

pub async fn whoami(copt: &CommonOpt) -> ExitCode {
    let client = copt.to_client().await;
    match client.whoami().await {
        Ok(profile) => {
            eprintln!("Welcome, {}!", profile.greeting_name());
            copt.output_mode.print_message(profile);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&client, e).await,
    }
}
