//! Admin authorization gate. One shared secret, injected from configuration,
//! compared in constant time. Every administrative handler goes through
//! `AdminGate::authorize` before touching the store.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AdminGate {
  secret: Option<Arc<str>>,
}

impl AdminGate {
  /// A blank or missing secret disables every admin operation.
  pub fn new(secret: Option<String>) -> Self {
    let secret = secret
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .map(Arc::from);
    Self { secret }
  }

  pub fn is_enabled(&self) -> bool { self.secret.is_some() }

  pub fn authorize(&self, presented: Option<&str>) -> Result<(), ApiError> {
    let (Some(expected), Some(presented)) = (self.secret.as_deref(), presented) else {
      return Err(ApiError::Auth);
    };
    if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
      Ok(())
    } else {
      Err(ApiError::Auth)
    }
  }
}

impl std::fmt::Debug for AdminGate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AdminGate").field("enabled", &self.is_enabled()).finish()
  }
}
