use clap::{Args, Parser, Subcommand};
use std::fmt;

#[derive(Debug, Clone, Copy, Default)]
/// The CLI output mode, either text or json, falls back to text if you ask for something other than text/json
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl From<OutputMode> for clap::builder::OsStr {
    fn from(output_mode: OutputMode) -> Self {
        match output_mode {
            OutputMode::Text => "text".into(),
            OutputMode::Json => "json".into(),
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = String;
    fn from_str(s: &str) -> Result<OutputMode, std::string::String> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputMode::Text),
            "json" => Ok(OutputMode::Json),
            _ => Ok(OutputMode::Text),
        }
    }
}

impl OutputMode {
    pub fn print_message<T>(self, input: T)
    where
        T: serde::Serialize + fmt::Debug + fmt::Display,
    {
        match self {
            OutputMode::Json => {
                println!(
                    "{}",
                    serde_json::to_string(&input).unwrap_or(format!("{input:?}"))
                );
            }
            OutputMode::Text => {
                println!("{input}");
            }
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CommonOpt {
    /// Enable debugging of the afiya tool
    #[clap(short, long, env = "AFIYA_DEBUG")]
    pub debug: bool,
    /// The URL of the afiya backend
    #[clap(short = 'H', long = "url", env = "AFIYA_URL",
    value_parser = clap::builder::NonEmptyStringValueParser::new())]
    pub addr: Option<String>,
    /// Output format, text or json
    #[clap(short, long = "output", env = "AFIYA_OUTPUT", default_value=OutputMode::default())]
    pub output_mode: OutputMode,
    /// Path to a file to cache tokens in, defaults to ~/.cache/afiya_tokens
    #[clap(
        long,
        env = "AFIYA_TOKEN_CACHE_PATH",
        hide = true,
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    pub token_cache_path: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct LoginOpt {
    #[clap(flatten)]
    pub copt: CommonOpt,
    /// The doctor account to sign in as
    #[clap(short, long)]
    pub username: String,
    #[clap(
        short,
        long,
        env = "AFIYA_PASSWORD",
        hide = true,
        value_parser = clap::builder::NonEmptyStringValueParser::new())]
    /// Supply a password to the login option
    pub password: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct LogoutOpt {
    #[clap(flatten)]
    pub copt: CommonOpt,
    #[clap(short, long)]
    /// Do not send a logout request to the server - only remove the session token locally.
    pub local_only: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RegisterOpt {
    #[clap(flatten)]
    pub copt: CommonOpt,
    #[clap(short, long)]
    pub username: String,
    #[clap(short, long)]
    pub email: String,
    #[clap(long = "first-name")]
    pub first_name: String,
    #[clap(long = "last-name")]
    pub last_name: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ProgramOpt {
    /// List all health programs
    #[clap(name = "list")]
    List(CommonOpt),
    /// Show a single program
    #[clap(name = "get")]
    Get {
        #[clap(flatten)]
        copt: CommonOpt,
        id: u64,
    },
    /// Create a new program
    #[clap(name = "create")]
    Create {
        #[clap(flatten)]
        copt: CommonOpt,
        name: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct ClientCreateOpt {
    #[clap(flatten)]
    pub copt: CommonOpt,
    pub name: String,
    /// Date of birth as YYYY-MM-DD
    #[clap(long = "dob")]
    pub date_of_birth: String,
    #[clap(long)]
    pub contact: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ClientUpdateOpt {
    #[clap(flatten)]
    pub copt: CommonOpt,
    pub id: u64,
    #[clap(long)]
    pub name: Option<String>,
    /// Date of birth as YYYY-MM-DD
    #[clap(long = "dob")]
    pub date_of_birth: Option<String>,
    /// New contact details, pass an empty string to remove them
    #[clap(long)]
    pub contact: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ClientOpt {
    /// List all clients
    #[clap(name = "list")]
    List(CommonOpt),
    /// Search clients by name, an empty query lists everyone
    #[clap(name = "search")]
    Search {
        #[clap(flatten)]
        copt: CommonOpt,
        #[clap(default_value = "")]
        query: String,
    },
    /// Show the raw record of a client
    #[clap(name = "get")]
    Get {
        #[clap(flatten)]
        copt: CommonOpt,
        id: u64,
    },
    /// Show a client with their enrollments and the programs available to them
    #[clap(name = "show")]
    Show {
        #[clap(flatten)]
        copt: CommonOpt,
        id: u64,
    },
    /// Register a new client
    #[clap(name = "create")]
    Create(ClientCreateOpt),
    /// Update a client's details
    #[clap(name = "update")]
    Update(ClientUpdateOpt),
    /// Enroll a client in a program
    #[clap(name = "enroll")]
    Enroll {
        #[clap(flatten)]
        copt: CommonOpt,
        id: u64,
        program_id: u64,
    },
}

#[derive(Debug, Subcommand, Clone)]
#[clap(about = "Afiya Client Utility")]
pub enum AfiyaClientOpt {
    /// Login as a doctor to use with future cli operations
    Login(LoginOpt),
    /// Logout of an active cli session
    Logout(LogoutOpt),
    /// Register a new doctor account
    Register(RegisterOpt),
    /// Show the account of the current session
    Whoami(CommonOpt),
    /// Actions to manage health programs
    Program {
        #[clap(subcommand)]
        commands: ProgramOpt,
    },
    /// Actions to manage clients and their enrollments
    Client {
        #[clap(subcommand)]
        commands: ClientOpt,
    },
    /// Prints the client version
    Version {},
}

#[derive(Debug, Parser, Clone)]
#[command(name = "afiya", version)]
pub struct AfiyaClientParser {
    #[clap(subcommand)]
    pub commands: AfiyaClientOpt,
}
