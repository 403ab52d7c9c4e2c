//! Supported source kinds and the credential fields each one takes.

use debugkit_core::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every source debugkit can dispatch to, configured or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Grafana dashboards and datasources
    Grafana,
    /// SigNoz metrics, traces and logs
    Signoz,
    /// Shell commands on a remote host over SSH
    Bash,
    /// kubectl style commands against a cluster
    Kubernetes,
    /// AWS CloudWatch metrics, logs and ECS
    Cloudwatch,
    /// Sentry issues and events
    Sentry,
    /// Datadog metrics, logs and dashboards
    Datadog,
    /// New Relic NRQL and entities
    Newrelic,
    /// PostgreSQL
    Postgres,
    /// PostHog product analytics
    Posthog,
    /// Any database reachable through a connection string
    SqlDatabaseConnection,
    /// ClickHouse
    Clickhouse,
}

/// Credential fields of one source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    /// Fields that must be present
    pub required: &'static [&'static str],
    /// Groups of which at least one field must be present
    pub one_of: &'static [&'static [&'static str]],
    /// Recognised optional fields
    pub optional: &'static [&'static str],
    /// Fields stored as secrets
    pub sensitive: &'static [&'static str],
}

impl CredentialSpec {
    /// Whether a field is stored as a secret
    #[must_use]
    pub fn is_sensitive(&self, field: &str) -> bool {
        self.sensitive.contains(&field)
    }

    /// Every field this source recognises
    pub fn known_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .chain(self.one_of.iter().flat_map(|group| group.iter()))
            .chain(self.optional.iter())
            .copied()
    }
}

impl SourceKind {
    /// All supported sources, in a stable order
    pub const ALL: [SourceKind; 12] = [
        SourceKind::Grafana,
        SourceKind::Signoz,
        SourceKind::Bash,
        SourceKind::Kubernetes,
        SourceKind::Cloudwatch,
        SourceKind::Sentry,
        SourceKind::Datadog,
        SourceKind::Newrelic,
        SourceKind::Postgres,
        SourceKind::Posthog,
        SourceKind::SqlDatabaseConnection,
        SourceKind::Clickhouse,
    ];

    /// Canonical lowercase name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grafana => "grafana",
            Self::Signoz => "signoz",
            Self::Bash => "bash",
            Self::Kubernetes => "kubernetes",
            Self::Cloudwatch => "cloudwatch",
            Self::Sentry => "sentry",
            Self::Datadog => "datadog",
            Self::Newrelic => "newrelic",
            Self::Postgres => "postgres",
            Self::Posthog => "posthog",
            Self::SqlDatabaseConnection => "sql_database_connection",
            Self::Clickhouse => "clickhouse",
        }
    }

    /// The `type` tag used in configuration blocks
    #[must_use]
    pub fn type_tag(&self) -> String {
        self.name().to_ascii_uppercase()
    }

    /// Resolve a configuration `type` tag
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(tag.trim()))
    }

    /// Credential fields for this source
    #[must_use]
    pub fn credential_spec(&self) -> &'static CredentialSpec {
        match self {
            Self::Grafana => &CredentialSpec {
                required: &["grafana_host", "grafana_api_key"],
                one_of: &[],
                optional: &["ssl_verify"],
                sensitive: &["grafana_api_key"],
            },
            Self::Signoz => &CredentialSpec {
                required: &["signoz_api_url"],
                one_of: &[],
                optional: &["signoz_api_token"],
                sensitive: &["signoz_api_token"],
            },
            Self::Bash => &CredentialSpec {
                required: &["remote_host", "remote_user"],
                one_of: &[&["remote_password", "remote_pem"]],
                optional: &["port"],
                sensitive: &["remote_password", "remote_pem"],
            },
            Self::Kubernetes => &CredentialSpec {
                required: &["kubeconfig"],
                one_of: &[],
                optional: &["context", "namespace"],
                sensitive: &["kubeconfig"],
            },
            Self::Cloudwatch => &CredentialSpec {
                required: &["aws_access_key_id", "aws_secret_access_key", "aws_region"],
                one_of: &[],
                optional: &[],
                sensitive: &["aws_secret_access_key"],
            },
            Self::Sentry => &CredentialSpec {
                required: &["sentry_api_url", "sentry_api_token"],
                one_of: &[],
                optional: &[],
                sensitive: &["sentry_api_token"],
            },
            Self::Datadog => &CredentialSpec {
                required: &["datadog_api_key", "datadog_app_key"],
                one_of: &[],
                optional: &["datadog_host"],
                sensitive: &["datadog_api_key", "datadog_app_key"],
            },
            Self::Newrelic => &CredentialSpec {
                required: &["newrelic_api_key", "newrelic_account_id"],
                one_of: &[],
                optional: &["newrelic_region"],
                sensitive: &["newrelic_api_key"],
            },
            Self::Postgres => &CredentialSpec {
                required: &["host", "user", "password", "database"],
                one_of: &[],
                optional: &["port"],
                sensitive: &["password"],
            },
            Self::Posthog => &CredentialSpec {
                required: &["posthog_api_key", "posthog_host"],
                one_of: &[],
                optional: &[],
                sensitive: &["posthog_api_key"],
            },
            Self::SqlDatabaseConnection => &CredentialSpec {
                required: &["connection_string"],
                one_of: &[],
                optional: &[],
                sensitive: &["connection_string"],
            },
            Self::Clickhouse => &CredentialSpec {
                required: &["clickhouse_host", "clickhouse_username", "clickhouse_password"],
                one_of: &[],
                optional: &["clickhouse_port", "clickhouse_database"],
                sensitive: &["clickhouse_password"],
            },
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ValidationError::unknown_source(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.name().parse::<SourceKind>().unwrap(), kind);
            assert_eq!(SourceKind::from_type_tag(&kind.type_tag()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_source_is_validation_error() {
        let err = "splunk".parse::<SourceKind>().unwrap_err();
        assert_eq!(err, ValidationError::unknown_source("splunk"));
        assert_eq!(SourceKind::from_type_tag("SPLUNK"), None);
    }

    #[test]
    fn test_type_tag_is_uppercased_name() {
        assert_eq!(SourceKind::SqlDatabaseConnection.type_tag(), "SQL_DATABASE_CONNECTION");
        assert_eq!(SourceKind::from_type_tag("grafana"), Some(SourceKind::Grafana));
    }

    #[test]
    fn test_sensitive_fields_are_known_fields() {
        for kind in SourceKind::ALL {
            let spec = kind.credential_spec();
            let known: Vec<_> = spec.known_fields().collect();
            for field in spec.sensitive {
                assert!(known.contains(field), "{kind}: {field} is not a known field");
            }
        }
    }

    #[test]
    fn test_bash_accepts_password_or_pem() {
        let spec = SourceKind::Bash.credential_spec();
        assert_eq!(spec.one_of, &[&["remote_password", "remote_pem"][..]]);
        assert!(spec.is_sensitive("remote_pem"));
        assert!(!spec.is_sensitive("remote_host"));
    }
}
