//! Credential store.
//!
//! Credentials come from a YAML mapping keyed by block name:
//!
//! ```yaml
//! grafana:
//!   grafana_host: https://grafana.internal
//!   grafana_api_key: glsa_xxx
//! staging_cluster:
//!   type: KUBERNETES
//!   id: 2
//!   kubeconfig: /etc/kube/staging.yaml
//! ```
//!
//! A block's source kind is its `type` tag when present, otherwise the block
//! name. A block may also be a list of entries, one per identity. Loading is
//! all or nothing: any bad block fails the whole store.

use crate::source::SourceKind;
use debugkit_core::{DebugKitError, Result, Validatable};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identity used when a block does not set `id`
pub const DEFAULT_IDENTITY: u32 = 1;

/// A secret credential value. Redacted in `Debug` and wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// The raw secret
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// One credential field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Plain text
    Plain(String),
    /// Secret
    Secret(Secret),
}

impl FieldValue {
    /// The raw value
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Secret(secret) => secret.expose(),
        }
    }

    /// Value safe to print
    #[must_use]
    pub fn redacted(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Secret(_) => debugkit_core::observability::MASK,
        }
    }

    /// Check if the value is a secret
    #[must_use]
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

/// Credentials for one identity of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCredential {
    source: SourceKind,
    identity: u32,
    block: String,
    fields: BTreeMap<String, FieldValue>,
}

impl SourceCredential {
    /// Create an empty credential; fields are added with [`Self::with_field`]
    #[must_use]
    pub fn new(source: SourceKind, identity: u32) -> Self {
        Self {
            source,
            identity,
            block: source.name().to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field, stored as a secret when the source marks it sensitive
    #[must_use]
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    fn insert(&mut self, key: String, value: String) {
        let value = if self.source.credential_spec().is_sensitive(&key) {
            FieldValue::Secret(Secret::new(value))
        } else {
            FieldValue::Plain(value)
        };
        self.fields.insert(key, value);
    }

    /// Source kind
    #[must_use]
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Identity, unique per source
    #[must_use]
    pub fn identity(&self) -> u32 {
        self.identity
    }

    /// Name of the configuration block this credential came from
    #[must_use]
    pub fn block_name(&self) -> &str {
        &self.block
    }

    /// Raw value of a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(FieldValue::expose)
    }

    /// Whether a field is present and non-empty
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some_and(|value| !value.trim().is_empty())
    }

    /// Field values
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Field names with redacted values
    #[must_use]
    pub fn redacted_fields(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), value.redacted().to_string()))
            .collect()
    }
}

impl Validatable for SourceCredential {
    fn validate(&self) -> Result<()> {
        let spec = self.source.credential_spec();
        let mut missing: Vec<String> = spec
            .required
            .iter()
            .filter(|field| !self.has(field))
            .map(|field| (*field).to_string())
            .collect();

        for group in spec.one_of {
            if !group.iter().any(|field| self.has(field)) {
                missing.push(format!("one of {}", group.join(" / ")));
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DebugKitError::config(format!(
                "block '{}' ({} id {}) is missing required field(s): {}",
                self.block,
                self.source,
                self.identity,
                missing.join(", ")
            )))
        }
    }
}

/// All configured credentials, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    by_source: BTreeMap<SourceKind, Vec<Arc<SourceCredential>>>,
}

impl CredentialStore {
    /// Load a credentials YAML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DebugKitError::config(format!(
                "failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;
        let store = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            sources = store.by_source.len(),
            credentials = store.len(),
            "loaded credentials"
        );
        Ok(store)
    }

    /// Parse credentials from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(DebugKitError::config("credentials document is empty"));
        }
        let root: Value = serde_yaml::from_str(content)?;
        Self::from_yaml_value(&root)
    }

    /// Build the store from a parsed YAML document
    pub fn from_yaml_value(root: &Value) -> Result<Self> {
        let blocks = match root {
            Value::Mapping(blocks) => blocks,
            Value::Null => return Err(DebugKitError::config("credentials document is empty")),
            _ => {
                return Err(DebugKitError::config(
                    "credentials document must be a mapping of source blocks",
                ))
            }
        };

        let mut credentials = Vec::new();
        for (key, block) in blocks {
            let block_name = key
                .as_str()
                .ok_or_else(|| DebugKitError::config("credential block names must be strings"))?;

            match block {
                Value::Mapping(entry) => credentials.push(parse_entry(block_name, entry)?),
                Value::Sequence(entries) => {
                    for entry in entries {
                        let entry = entry.as_mapping().ok_or_else(|| {
                            DebugKitError::config(format!(
                                "entries of block '{block_name}' must be mappings"
                            ))
                        })?;
                        credentials.push(parse_entry(block_name, entry)?);
                    }
                }
                Value::Null => {
                    return Err(DebugKitError::config(format!(
                        "credential block '{block_name}' is empty"
                    )))
                }
                _ => {
                    return Err(DebugKitError::config(format!(
                        "credential block '{block_name}' must be a mapping or a list of mappings"
                    )))
                }
            }
        }

        Self::from_credentials(credentials)
    }

    /// Build the store from credential records
    pub fn from_credentials<I>(credentials: I) -> Result<Self>
    where
        I: IntoIterator<Item = SourceCredential>,
    {
        let mut seen = HashSet::new();
        let mut by_source: BTreeMap<SourceKind, Vec<Arc<SourceCredential>>> = BTreeMap::new();

        for credential in credentials {
            credential.validate()?;
            if !seen.insert((credential.source(), credential.identity())) {
                return Err(DebugKitError::config(format!(
                    "duplicate credential for source '{}' with id {} (block '{}')",
                    credential.source(),
                    credential.identity(),
                    credential.block_name()
                )));
            }
            by_source
                .entry(credential.source())
                .or_default()
                .push(Arc::new(credential));
        }

        Ok(Self { by_source })
    }

    /// Sources with at least one credential
    #[must_use]
    pub fn configured_sources(&self) -> Vec<SourceKind> {
        self.by_source.keys().copied().collect()
    }

    /// Whether a source has at least one credential
    #[must_use]
    pub fn is_configured(&self, source: SourceKind) -> bool {
        self.by_source.contains_key(&source)
    }

    /// Credentials of a source, in configuration order
    #[must_use]
    pub fn credentials(&self, source: SourceKind) -> &[Arc<SourceCredential>] {
        self.by_source
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The first configured credential of a source
    #[must_use]
    pub fn default_credential(&self, source: SourceKind) -> Option<Arc<SourceCredential>> {
        self.credentials(source).first().cloned()
    }

    /// The credential with a given identity
    #[must_use]
    pub fn get(&self, source: SourceKind, identity: u32) -> Option<Arc<SourceCredential>> {
        self.credentials(source)
            .iter()
            .find(|credential| credential.identity() == identity)
            .cloned()
    }

    /// Total number of credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    /// Whether no credentials are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

fn parse_entry(block_name: &str, entry: &Mapping) -> Result<SourceCredential> {
    let source = match entry.get("type") {
        Some(Value::String(tag)) => SourceKind::from_type_tag(tag).ok_or_else(|| {
            DebugKitError::config(format!(
                "type tag '{tag}' of block '{block_name}' does not match a known source"
            ))
        })?,
        Some(_) => {
            return Err(DebugKitError::config(format!(
                "type tag of block '{block_name}' must be a string"
            )))
        }
        None => block_name.parse().map_err(|_| {
            DebugKitError::config(format!(
                "block '{block_name}' is not a known source name and has no type tag"
            ))
        })?,
    };

    let identity = match entry.get("id") {
        None | Some(Value::Null) => DEFAULT_IDENTITY,
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| {
                DebugKitError::config(format!(
                    "id of block '{block_name}' must be a non-negative integer"
                ))
            })?,
        Some(_) => {
            return Err(DebugKitError::config(format!(
                "id of block '{block_name}' must be an integer"
            )))
        }
    };

    let mut credential = SourceCredential::new(source, identity);
    credential.block = block_name.to_string();

    let spec = source.credential_spec();
    for (key, value) in entry {
        let key = key.as_str().ok_or_else(|| {
            DebugKitError::config(format!("field names of block '{block_name}' must be strings"))
        })?;
        if key == "type" || key == "id" {
            continue;
        }
        let Some(value) = scalar_text(value)? else {
            continue;
        };
        if !spec.known_fields().any(|field| field == key) {
            debug!(block = block_name, field = key, "keeping unrecognised credential field");
        }
        credential.insert(key.to_string(), value);
    }

    Ok(credential)
}

fn scalar_text(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(number.to_string())),
        // Inline documents such as an embedded kubeconfig are kept as YAML text
        Value::Sequence(_) | Value::Mapping(_) => Ok(Some(serde_yaml::to_string(value)?)),
        Value::Tagged(tagged) => Err(DebugKitError::config(format!(
            "unsupported YAML tag {} in credentials",
            tagged.tag
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r"
grafana:
  grafana_host: https://grafana.internal
  grafana_api_key: glsa_secret
  ssl_verify: false
bash:
  remote_host: 10.0.0.5
  remote_user: ops
  remote_pem: |
    -----BEGIN KEY-----
  port: 2222
";

    #[test]
    fn test_load_basic_blocks() {
        let store = CredentialStore::from_yaml_str(CONFIG).unwrap();
        assert_eq!(store.configured_sources(), vec![SourceKind::Grafana, SourceKind::Bash]);
        assert_eq!(store.len(), 2);

        let grafana = store.default_credential(SourceKind::Grafana).unwrap();
        assert_eq!(grafana.identity(), DEFAULT_IDENTITY);
        assert_eq!(grafana.get("ssl_verify"), Some("false"));
        assert_eq!(grafana.get("grafana_api_key"), Some("glsa_secret"));
        assert_eq!(grafana.redacted_fields()["grafana_api_key"], "***");

        let bash = store.default_credential(SourceKind::Bash).unwrap();
        assert_eq!(bash.get("port"), Some("2222"));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let credential = SourceCredential::new(SourceKind::Sentry, 1)
            .with_field("sentry_api_url", "https://sentry.io")
            .with_field("sentry_api_token", "sntrys_abc");
        let printed = format!("{credential:?}");
        assert!(!printed.contains("sntrys_abc"));
        assert!(printed.contains("https://sentry.io"));
    }

    #[test]
    fn test_type_tag_and_identity() {
        let store = CredentialStore::from_yaml_str(
            r"
prod_k8s:
  type: KUBERNETES
  id: 7
  kubeconfig: /etc/kube/prod
staging_k8s:
  type: KUBERNETES
  id: 8
  kubeconfig: /etc/kube/staging
",
        )
        .unwrap();
        let all = store.credentials(SourceKind::Kubernetes);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].block_name(), "prod_k8s");
        assert_eq!(store.get(SourceKind::Kubernetes, 8).unwrap().block_name(), "staging_k8s");
    }

    #[test]
    fn test_list_block_with_duplicate_identity_fails() {
        let err = CredentialStore::from_yaml_str(
            r"
signoz:
  - signoz_api_url: http://a
  - signoz_api_url: http://b
",
        )
        .unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = CredentialStore::from_yaml_str("grafana:\n  grafana_host: https://g\n").unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("grafana_api_key")));
    }

    #[test]
    fn test_bash_needs_password_or_pem() {
        let err =
            CredentialStore::from_yaml_str("bash:\n  remote_host: h\n  remote_user: u\n").unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("remote_password / remote_pem")));
    }

    #[test]
    fn test_unknown_type_tag_fails() {
        let err = CredentialStore::from_yaml_str("metrics:\n  type: SPLUNK\n  url: x\n").unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("SPLUNK")));

        let err = CredentialStore::from_yaml_str("splunk:\n  url: x\n").unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("no type tag")));
    }

    #[test]
    fn test_empty_and_invalid_documents_fail() {
        assert!(CredentialStore::from_yaml_str("").is_err());
        assert!(CredentialStore::from_yaml_str("# nothing here\n").is_err());
        assert!(CredentialStore::from_yaml_str("- grafana\n").is_err());
        assert!(CredentialStore::from_yaml_str("grafana: [unclosed").is_err());
    }

    #[test]
    fn test_inline_kubeconfig_is_kept_as_yaml() {
        let store = CredentialStore::from_yaml_str(
            r"
kubernetes:
  kubeconfig:
    apiVersion: v1
    clusters: []
",
        )
        .unwrap();
        let kubeconfig = store
            .default_credential(SourceKind::Kubernetes)
            .unwrap()
            .get("kubeconfig")
            .map(str::to_string)
            .unwrap();
        assert!(kubeconfig.contains("apiVersion: v1"));
    }
}
