//! Core types for the a3s-access system
//!
//! All types use camelCase JSON serialization so sinks can record them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque biometric template attached to an identity
///
/// Compared by value only. No matching algorithm is applied; two templates
/// are the same principal's iff every field is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricTemplate {
    /// Fingerprint digest
    pub fingerprint: String,

    /// Iris digest
    pub iris: String,
}

impl BiometricTemplate {
    /// Create a new template
    pub fn new(fingerprint: impl Into<String>, iris: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            iris: iris.into(),
        }
    }
}

impl fmt::Display for BiometricTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Biometric data [fingerprint: {}, iris: {}]",
            self.fingerprint, self.iris
        )
    }
}

/// A principal presenting itself for access
///
/// Equality is value-based: two independently constructed identities with
/// the same name and template compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    name: String,
    template: BiometricTemplate,
}

impl Identity {
    /// Create an identity from a display name and biometric template
    pub fn new(name: impl Into<String>, template: BiometricTemplate) -> Self {
        Self {
            name: name.into(),
            template,
        }
    }

    /// Principal display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Biometric template
    pub fn template(&self) -> &BiometricTemplate {
        &self.template
    }

    /// True when the identity carries no principal name
    pub fn is_unset(&self) -> bool {
        self.name.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User [name: {}]", self.name)
    }
}

/// Outcome of a single access attempt
///
/// Created once per attempt by the engine and handed to every observer.
/// Fields never change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    identity: Identity,
    granted: bool,
}

impl AccessEvent {
    /// Create a new access event
    pub fn new(identity: Identity, granted: bool) -> Self {
        Self { identity, granted }
    }

    /// The identity that attempted access
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether access was granted
    pub fn granted(&self) -> bool {
        self.granted
    }

    /// Whether access was denied
    pub fn is_denied(&self) -> bool {
        !self.granted
    }

    /// Status label used in logs and audit records
    pub fn status(&self) -> &'static str {
        status_label(self.granted)
    }
}

/// Status label for a decision outcome
pub(crate) fn status_label(granted: bool) -> &'static str {
    if granted {
        "GRANTED"
    } else {
        "DENIED"
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Access event [user: {}, status: {}]",
            self.identity.name, self.status()
        )
    }
}
