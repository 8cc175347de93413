//! Bearer token records and the secret wrapper shared with client credentials.

pub mod record;
pub mod secret;
