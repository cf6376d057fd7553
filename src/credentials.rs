//! Gemini API key holder.
//!
//! Injected into the Gemini client as `Arc<KeyStore>`; the key can be replaced
//! or cleared at runtime through the settings endpoints. The key itself is
//! never logged.

use std::sync::RwLock;

use tracing::info;

const PLACEHOLDER: &str = "YOUR_GEMINI_API_KEY_HERE";
const KEY_PREFIX: &str = "AIza";
const MIN_KEY_LEN: usize = 20;

#[derive(Debug, Default)]
pub struct KeyStore {
  key: RwLock<Option<String>>,
}

impl KeyStore {
  pub fn new(key: Option<String>) -> Self {
    Self { key: RwLock::new(key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())) }
  }

  /// Seeded from GEMINI_API_KEY when present.
  pub fn from_env() -> Self {
    Self::new(std::env::var("GEMINI_API_KEY").ok())
  }

  /// Format check for Gemini keys: `AIza` prefix, >= 20 chars, URL-safe charset.
  pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
      && key != PLACEHOLDER
      && key.len() >= MIN_KEY_LEN
      && key.starts_with(KEY_PREFIX)
      && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
  }

  pub fn is_configured(&self) -> bool {
    self.get().map(|k| Self::is_valid_key(&k)).unwrap_or(false)
  }

  /// Current key, if any (even a malformed one).
  pub fn get(&self) -> Option<String> {
    self.key.read().ok().and_then(|k| k.clone())
  }

  /// Store a new key. Returns whether it passes the format check.
  pub fn set(&self, key: &str) -> bool {
    let key = key.trim().to_string();
    let valid = Self::is_valid_key(&key);
    if let Ok(mut slot) = self.key.write() {
      *slot = Some(key).filter(|k| !k.is_empty());
    }
    info!(target: "edai_backend", valid, "Gemini API key updated");
    valid
  }

  pub fn clear(&self) {
    if let Ok(mut slot) = self.key.write() {
      *slot = None;
    }
    info!(target: "edai_backend", "Gemini API key cleared");
  }

  /// User-facing configuration status.
  pub fn status_message(&self) -> String {
    if self.is_configured() {
      "Gemini AI is properly configured and ready to use!".into()
    } else {
      [
        "Please configure your Gemini API key to enable AI features.",
        "",
        "How to get your API key:",
        "1. Go to aistudio.google.com",
        "2. Sign in with your Google account",
        "3. Click 'Get API key' in the sidebar",
        "4. Create a new API key in new project",
        "5. Copy the key (starts with 'AIza')",
        "6. Enter it in the settings field",
      ]
      .join("\n")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const GOOD: &str = "AIzaSyA1234567890abcdefghij";

  #[test]
  fn validates_key_format() {
    assert!(KeyStore::is_valid_key(GOOD));
    assert!(!KeyStore::is_valid_key(PLACEHOLDER));
    assert!(!KeyStore::is_valid_key("AIza-short"));
    assert!(!KeyStore::is_valid_key("sk-1234567890abcdefghijkl"));
    assert!(!KeyStore::is_valid_key("AIzaSyA1234567890abc def"));
  }

  #[test]
  fn set_and_clear_update_configuration() {
    let store = KeyStore::new(None);
    assert!(!store.is_configured());
    assert!(store.status_message().contains("aistudio.google.com"));

    assert!(store.set(GOOD));
    assert!(store.is_configured());
    assert!(store.status_message().contains("ready to use"));

    store.clear();
    assert!(!store.is_configured());
    assert_eq!(store.get(), None);
  }

  #[test]
  fn malformed_key_is_stored_but_not_configured() {
    let store = KeyStore::new(Some("  not-a-key  ".into()));
    assert_eq!(store.get().as_deref(), Some("not-a-key"));
    assert!(!store.is_configured());
  }
}
