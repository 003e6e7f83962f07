//! Backend endpoints
//!
//! The trailing slashes are significant, the backend issues a redirect without
//! them which drops the request body.

pub const AFIYA_PROGRAMS: &str = "/afiya/programs/";
pub const AFIYA_CLIENTS: &str = "/afiya/clients/";
pub const AFIYA_CLIENTS_SEARCH: &str = "/afiya/clients/search/";
pub const AFIYA_DOCTORS_REGISTER: &str = "/afiya/doctors/register/";
pub const AFIYA_LOGIN: &str = "/afiya/login/";
pub const AFIYA_USER_PROFILE: &str = "/afiya/user/profile/";

/// Session logout from the browsable API.
pub const API_AUTH_LOGOUT: &str = "/api-auth/logout/";

/// Serving this page sets the anti-forgery cookie.
pub const LOGIN_PAGE: &str = "/login";

pub fn afiya_program(id: u64) -> String {
    format!("{}{}/", AFIYA_PROGRAMS, id)
}

pub fn afiya_client(id: u64) -> String {
    format!("{}{}/", AFIYA_CLIENTS, id)
}

pub fn afiya_client_enroll(id: u64) -> String {
    format!("{}{}/enroll/", AFIYA_CLIENTS, id)
}
