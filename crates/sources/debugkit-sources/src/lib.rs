//! # debugkit sources
//!
//! Everything debugkit knows about individual sources without talking to
//! them: the supported [`SourceKind`]s, the [`CredentialStore`] that parses
//! their credentials, the [`ConnectorFactory`] that turns a credential into a
//! [`SourceConnection`], and the built-in task catalogue.
//!
//! ## Quick Start
//!
//! ```rust
//! use debugkit_sources::{CredentialStore, SourceKind};
//!
//! let store = CredentialStore::from_yaml_str(
//!     "grafana:\n  grafana_host: https://grafana.local\n  grafana_api_key: glsa\n",
//! )
//! .unwrap();
//! assert!(store.is_configured(SourceKind::Grafana));
//! assert!(!store.is_configured(SourceKind::Bash));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod credentials;
pub mod factory;
pub mod source;

pub use catalog::builtin_tasks;
pub use credentials::{CredentialStore, FieldValue, Secret, SourceCredential, DEFAULT_IDENTITY};
pub use factory::{check_credential_shape, ConnectorFactory, ConnectorProvider, FnProvider, SourceConnection};
pub use source::{CredentialSpec, SourceKind};
