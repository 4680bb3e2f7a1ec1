use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// An access token issued by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  pub fn token(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Credential(***)")
  }
}

/// The current credential, possibly absent, with change notification.
///
/// Cloning shares the same underlying value.
#[derive(Debug, Clone)]
pub struct CredentialSource {
  sender: Arc<watch::Sender<Option<Credential>>>,
}

impl CredentialSource {
  pub fn new(initial: Option<Credential>) -> Self {
    let (sender, _) = watch::channel(initial);
    Self {
      sender: Arc::new(sender),
    }
  }

  pub fn current(&self) -> Option<Credential> {
    self.sender.borrow().clone()
  }

  pub fn is_present(&self) -> bool {
    self.sender.borrow().is_some()
  }

  /// Replace the credential after a renewal.
  pub fn renew(&self, credential: Credential) {
    self.sender.send_replace(Some(credential));
  }

  /// Drop the credential (sign-out or expiry).
  pub fn revoke(&self) {
    self.sender.send_replace(None);
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
    self.sender.subscribe()
  }
}

impl Default for CredentialSource {
  fn default() -> Self {
    Self::new(None)
  }
}
