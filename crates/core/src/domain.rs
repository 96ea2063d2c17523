// crates/core/src/domain.rs
//! Backbone vocabulary: client and device classification plus the numeric
//! status/type codes stored by the backbone, mapped to display names.

use std::fmt;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Kind of a registered backbone client.
///
/// Declaration order is the display order of chart facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClientType {
    App,
    Connector,
}

impl ClientType {
    pub const ALL: [ClientType; 2] = [ClientType::App, ClientType::Connector];

    pub fn as_str(self) -> &'static str {
        match self {
            ClientType::App => "App",
            ClientType::Connector => "Connector",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device platform derived from the push-notification handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Android,
    Apple,
    #[serde(rename = "SSE")]
    Sse,
    Unknown,
}

impl DeviceType {
    /// Classify a PNS handle by its `<platform>|` prefix.
    ///
    /// - `fcm|…` → Android
    /// - `apns|…` → Apple
    /// - `sse|…` → SSE
    /// - anything else, or no handle → Unknown
    pub fn from_pns_handle(handle: Option<&str>) -> Self {
        match handle {
            Some(h) if h.starts_with("fcm|") => DeviceType::Android,
            Some(h) if h.starts_with("apns|") => DeviceType::Apple,
            Some(h) if h.starts_with("sse|") => DeviceType::Sse,
            _ => DeviceType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Android => "Android",
            DeviceType::Apple => "Apple",
            DeviceType::Sse => "SSE",
            DeviceType::Unknown => "Unknown",
        }
    }
}

/// A closed table of stored codes with display names, in code order.
pub trait CodeCategory: Copy + PartialEq + fmt::Display + 'static {
    const ALL: &'static [Self];

    fn from_code(code: i32) -> Option<Self>;
}

/// Defines a code-backed enum with `from_code` and `as_str`.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Map a stored code to its variant. Unknown codes yield `None`.
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl CodeCategory for $name {
            const ALL: &'static [Self] = $name::ALL;

            fn from_code(code: i32) -> Option<Self> {
                $name::from_code(code)
            }
        }
    };
}

code_enum! {
    /// Lifecycle state of a relationship between two identities.
    RelationshipStatus {
        Pending = 10,
        Active = 20,
        Rejected = 30,
        Revoked = 40,
        Terminated = 50,
        DeletionProposed = 60,
        ReadyForDeletion = 70,
    }
}

code_enum! {
    /// Kind of change recorded in a datawallet modification.
    DatawalletModificationType {
        Create = 0,
        Update = 1,
        Delete = 2,
        CacheChanged = 3,
    }
}

code_enum! {
    IdentityStatus {
        Active = 0,
        ToBeDeleted = 1,
        Deleting = 2,
    }
}

code_enum! {
    /// Event pushed to an identity during synchronization.
    ExternalEventType {
        MessageReceived = 0,
        MessageDelivered = 1,
        RelationshipChangeCreated = 2,
        RelationshipChangeCompleted = 3,
        IdentityDeletionProcessStarted = 4,
        IdentityDeletionProcessStatusChanged = 5,
        PeerToBeDeleted = 6,
        PeerDeletionCancelled = 7,
        PeerDeleted = 8,
    }
}

code_enum! {
    /// Why a relationship audit log entry was written.
    RelationshipAuditLogReason {
        Creation = 0,
        AcceptanceOfCreation = 1,
        RejectionOfCreation = 2,
        RevocationOfCreation = 3,
        Termination = 4,
        ReactivationRequested = 5,
        AcceptanceOfReactivation = 6,
        RejectionOfReactivation = 7,
        RevocationOfReactivation = 8,
        Decomposition = 9,
        DecompositionDueToIdentityDeletion = 10,
    }
}

/// Collections a datawallet modification can target.
pub const DATAWALLET_MODIFICATION_COLLECTIONS: [&str; 12] = [
    "Tokens",
    "Notifications",
    "IdentityDeletionProcess",
    "Templates",
    "Settings",
    "Secrets",
    "Requests",
    "Relationships",
    "Messages",
    "Files",
    "Devices",
    "Attributes",
];

/// Compile `pattern` so that it only matches a whole client id.
pub fn full_match_regex(pattern: &str) -> Result<Regex, regex_lite::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Classifies client ids as App/Connector and test/non-test.
#[derive(Debug, Clone)]
pub struct ClientClassifier {
    app_clients: Regex,
    test_clients: Regex,
}

impl ClientClassifier {
    pub fn new(app_clients: Regex, test_clients: Regex) -> Self {
        Self {
            app_clients,
            test_clients,
        }
    }

    /// Build a classifier from raw patterns with full-match semantics.
    pub fn from_patterns(app_clients: &str, test_clients: &str) -> Result<Self, regex_lite::Error> {
        Ok(Self::new(
            full_match_regex(app_clients)?,
            full_match_regex(test_clients)?,
        ))
    }

    pub fn is_app_client(&self, client_id: &str) -> bool {
        self.app_clients.is_match(client_id)
    }

    pub fn is_test_client(&self, client_id: &str) -> bool {
        self.test_clients.is_match(client_id)
    }

    pub fn client_type(&self, client_id: &str) -> ClientType {
        if self.is_app_client(client_id) {
            ClientType::App
        } else {
            ClientType::Connector
        }
    }

    /// Keep only the items whose client is not a test client when `hide` is set.
    pub fn retain_visible<T>(&self, items: &mut Vec<T>, hide: bool, client_id: impl Fn(&T) -> &str) {
        if hide {
            items.retain(|item| !self.is_test_client(client_id(item)));
        }
    }
}
