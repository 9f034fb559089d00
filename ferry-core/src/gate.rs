use crate::{FerryError, Result};
use std::fmt;

/// Header carrying the shared secret on every inbound call.
pub const AUTH_HEADER: &str = "X-Auth-Key";

/// Shared-secret check applied before any registry or transfer operation.
///
/// The secret is fixed for the lifetime of the process.
#[derive(Clone)]
pub struct RequestGate {
    secret: String,
}

impl RequestGate {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(FerryError::Config("auth secret cannot be empty".to_string()));
        }

        Ok(Self { secret })
    }

    pub fn authorize(&self, header_value: Option<&str>) -> bool {
        header_value == Some(self.secret.as_str())
    }

    pub fn check(&self, header_value: Option<&str>) -> Result<()> {
        if self.authorize(header_value) {
            Ok(())
        } else {
            Err(FerryError::Unauthorized)
        }
    }
}

impl fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("secret", &"<redacted>")
            .finish()
    }
}
