use serde::{Deserialize, Serialize};
use std::fmt;

mod auth;

pub use self::auth::*;

/* ===== programs ===== */

/// A health program offered by the clinic, such as TB or HIV care.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Program {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProgramCreate {
    pub name: String,
}

/* ===== clients ===== */

/// A client (patient) registered with the clinic, with the programs they are
/// enrolled in expanded inline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: u64,
    pub name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub enrolled_programs: Vec<Program>,
}

impl Client {
    /// Contact info as shown to a user, the backend allows it to be blank.
    pub fn contact_display(&self) -> &str {
        match self.contact_info.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "N/A",
        }
    }

    pub fn enrolled_program(&self, program_id: u64) -> Option<&Program> {
        self.enrolled_programs.iter().find(|p| p.id == program_id)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "id: {}", self.id)?;
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "date_of_birth: {}", self.date_of_birth)?;
        writeln!(f, "contact_info: {}", self.contact_display())?;
        if self.enrolled_programs.is_empty() {
            write!(f, "enrolled_programs: none")
        } else {
            write!(f, "enrolled_programs:")?;
            for p in &self.enrolled_programs {
                write!(f, "\n  {}", p)?;
            }
            Ok(())
        }
    }
}

/// Body of a client registration. A missing contact is sent as `null`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientCreate {
    pub name: String,
    pub date_of_birth: String,
    pub contact_info: Option<String>,
}

/// Body of a partial client update (PATCH).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientUpdate {
    pub name: String,
    pub date_of_birth: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct EnrollRequest {
    pub program_id: u64,
}
