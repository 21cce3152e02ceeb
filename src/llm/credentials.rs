//! Ordered pool of generation credentials with one active at a time.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Non-empty, cyclic credential pool.
///
/// The pool never shrinks; `rotate` only moves the active index.
pub struct CredentialPool {
    credentials: Vec<SecretString>,
    active: usize,
}

impl CredentialPool {
    /// Build a pool. Fails when `credentials` is empty.
    pub fn new(credentials: Vec<SecretString>) -> Result<Self, ConfigError> {
        if credentials.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "GEMINI_API_KEY".to_string(),
                hint: "Provide one or more keys separated by commas.".to_string(),
            });
        }
        Ok(Self {
            credentials,
            active: 0,
        })
    }

    /// Parse a comma-separated list, ignoring blank entries.
    pub fn from_csv(raw: &str) -> Result<Self, ConfigError> {
        let credentials = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.to_string()))
            .collect();
        Self::new(credentials)
    }

    pub fn current(&self) -> &SecretString {
        &self.credentials[self.active]
    }

    /// Advance to the next credential, wrapping to the first.
    pub fn rotate(&mut self) -> &SecretString {
        self.active = (self.active + 1) % self.credentials.len();
        &self.credentials[self.active]
    }

    pub fn index(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.credentials.len())
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn empty_pool_rejected() {
        assert!(CredentialPool::new(vec![]).is_err());
        assert!(CredentialPool::from_csv(" , ,").is_err());
    }

    #[test]
    fn csv_parsing_trims_and_skips_blanks() {
        let pool = CredentialPool::from_csv(" a , ,b,").unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.current().expose_secret(), "a");
    }

    #[test]
    fn rotation_wraps() {
        let mut pool = CredentialPool::from_csv("a,b,c").unwrap();
        assert_eq!(pool.rotate().expose_secret(), "b");
        assert_eq!(pool.rotate().expose_secret(), "c");
        assert_eq!(pool.rotate().expose_secret(), "a");
        assert_eq!(pool.index(), 0);
    }

    #[test]
    fn full_cycle_returns_to_start_from_any_index() {
        for start in 0..4 {
            let mut pool = CredentialPool::from_csv("a,b,c,d").unwrap();
            for _ in 0..start {
                pool.rotate();
            }
            assert_eq!(pool.index(), start);
            for _ in 0..pool.len() {
                pool.rotate();
            }
            assert_eq!(pool.index(), start);
        }
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let pool = CredentialPool::from_csv("super-secret").unwrap();
        let rendered = format!("{pool:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
