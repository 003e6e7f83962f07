#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]
// We allow expect since it forces good error messages at the least.
#![allow(clippy::expect_used)]

#[macro_use]
extern crate tracing;

use std::process::ExitCode;

include!("../opt/afiya.rs");

pub mod clients;
pub mod common;
pub mod program;
pub mod session;

impl AfiyaClientOpt {
    pub fn debug(&self) -> bool {
        match self {
            AfiyaClientOpt::Login(lopt) => lopt.debug(),
            AfiyaClientOpt::Logout(lopt) => lopt.debug(),
            AfiyaClientOpt::Register(ropt) => ropt.debug(),
            AfiyaClientOpt::Whoami(copt) => copt.debug,
            AfiyaClientOpt::Program { commands } => commands.debug(),
            AfiyaClientOpt::Client { commands } => commands.debug(),
            AfiyaClientOpt::Version {} => {
                println!("afiya {}", env!("CARGO_PKG_VERSION"));
                true
            }
        }
    }

    pub async fn exec(&self) -> ExitCode {
        match self {
            AfiyaClientOpt::Login(lopt) => lopt.exec().await,
            AfiyaClientOpt::Logout(lopt) => lopt.exec().await,
            AfiyaClientOpt::Register(ropt) => ropt.exec().await,
            AfiyaClientOpt::Whoami(copt) => session::whoami(copt).await,
            AfiyaClientOpt::Program { commands } => commands.exec().await,
            AfiyaClientOpt::Client { commands } => commands.exec().await,
            AfiyaClientOpt::Version {} => ExitCode::SUCCESS,
        }
    }
}

pub(crate) fn password_prompt(prompt: &str) -> Option<String> {
    for _ in 0..3 {
        let password = rpassword::prompt_password(prompt).ok()?;

        let password_confirm =
            rpassword::prompt_password("Retype the new password to confirm: ").ok()?;

        if password == password_confirm {
            return Some(password);
        } else {
            error!("Passwords do not match");
        }
    }
    None
}
