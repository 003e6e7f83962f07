//! The Afiya Protocol Library
//!
//! This is the wire format for communicating with the Afiya clinic backend.
//! Both the client library and the CLI depend on these types, so changing
//! them changes what goes over the wire.

#![warn(unused_extern_crates)]
#![forbid(unsafe_code)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

pub mod constants;
pub mod v1;
