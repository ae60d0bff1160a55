//! Credential references and their resolution against an external secret source.

use std::{
    cell::RefCell,
    collections::HashMap,
    env,
    fmt::{self, Debug, Display, Formatter},
};

use tracing::debug;

use crate::{constants::REDACTED, errors::ConfigError};

/// Symbolic name of a secret, e.g. `PRIVATE_KEY`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Reference to the environment key `name`
    pub fn new(name: impl Into<String>) -> Self {
        CredentialRef(name.into())
    }

    /// The environment key name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CredentialRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CredentialRef {
    fn from(name: &str) -> Self {
        CredentialRef::new(name)
    }
}

/// A resolved secret value. Formatting it never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Access the plaintext value, only to hand it to the consumer that needs it
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the value is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl Display for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Read-only mapping from reference name to secret value
pub trait SecretSource {
    /// Look up `name` by exact key
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<S: SecretSource + ?Sized> SecretSource for &S {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// Secrets read from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn lookup(&self, name: &str) -> Option<String> {
        // A non unicode value can't be interpolated anyway, treat it as absent
        env::var(name).ok()
    }
}

/// In-memory secret source
#[derive(Debug, Clone, Default)]
pub struct MapSecretSource {
    values: HashMap<String, String>,
}

impl MapSecretSource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSecretSource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        MapSecretSource {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretSource for MapSecretSource {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Resolves credential references, reading each one from the source at most once
pub struct CredentialResolver<S> {
    source: S,
    cache: RefCell<HashMap<CredentialRef, Option<Secret>>>,
}

impl<S: SecretSource> CredentialResolver<S> {
    /// Resolver over `source` with an empty cache
    pub fn new(source: S) -> Self {
        CredentialResolver {
            source,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve `reference`, failing only if it is undefined. An empty value is returned as is.
    pub fn resolve_secret(&self, reference: &CredentialRef) -> Result<Secret, ConfigError> {
        if let Some(cached) = self.cache.borrow().get(reference) {
            return cached
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential(reference.to_string()));
        }

        let value = self.source.lookup(reference.as_str()).map(Secret::new);
        debug!(
            "Looked up credential {} (defined: {})",
            reference,
            value.is_some()
        );
        self.cache
            .borrow_mut()
            .insert(reference.clone(), value.clone());

        value.ok_or_else(|| ConfigError::MissingCredential(reference.to_string()))
    }

    /// Resolve `reference`, treating an empty value as missing
    pub fn resolve_non_empty(&self, reference: &CredentialRef) -> Result<Secret, ConfigError> {
        let secret = self.resolve_secret(reference)?;
        if secret.is_empty() {
            return Err(ConfigError::MissingCredential(reference.to_string()));
        }
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Counts how many times the underlying source is hit
    struct CountingSource {
        inner: MapSecretSource,
        hits: Cell<usize>,
    }

    impl SecretSource for CountingSource {
        fn lookup(&self, name: &str) -> Option<String> {
            self.hits.set(self.hits.get() + 1);
            self.inner.lookup(name)
        }
    }

    #[test]
    fn resolves_defined_secret() {
        let resolver = CredentialResolver::new(MapSecretSource::new().with("PRIVATE_KEY", "0xabc"));
        let secret = resolver.resolve_secret(&"PRIVATE_KEY".into()).unwrap();
        assert_eq!(secret.expose(), "0xabc");
    }

    #[test]
    fn missing_secret_names_the_exact_reference() {
        let resolver = CredentialResolver::new(MapSecretSource::new());
        let err = resolver.resolve_secret(&"R".into()).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential("R".to_string()));
    }

    #[test]
    fn empty_secret_is_accepted_unless_required() {
        let resolver = CredentialResolver::new(MapSecretSource::new().with("EMPTY", ""));
        assert!(resolver.resolve_secret(&"EMPTY".into()).unwrap().is_empty());
        assert_eq!(
            resolver.resolve_non_empty(&"EMPTY".into()).unwrap_err(),
            ConfigError::MissingCredential("EMPTY".to_string())
        );
    }

    #[test]
    fn secrets_never_format_their_value() {
        let secret = Secret::new("0xdeadbeef");
        assert!(!format!("{:?}", secret).contains("deadbeef"));
        assert!(!format!("{}", secret).contains("deadbeef"));
    }

    #[test]
    fn each_reference_is_read_once() {
        let source = CountingSource {
            inner: MapSecretSource::new().with("A", "1"),
            hits: Cell::new(0),
        };
        let resolver = CredentialResolver::new(&source);
        for _ in 0..3 {
            resolver.resolve_secret(&"A".into()).unwrap();
            let _ = resolver.resolve_secret(&"B".into());
        }
        assert_eq!(source.hits.get(), 2);
    }

    #[test]
    fn map_source_collects_from_pairs() {
        let source: MapSecretSource = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(source.lookup("B").as_deref(), Some("2"));
        assert_eq!(source.lookup("b"), None);
    }
}
