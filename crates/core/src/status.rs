//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed order (1-based) of the
//! corresponding `*_statuses` table. The API speaks the symbolic names;
//! the store speaks the ids.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Internal(format!(
                        "Unknown {} id {other}",
                        stringify!($name)
                    ))),
                }
            }

            /// Symbolic name used on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse a symbolic name.
            pub fn parse(value: &str) -> Result<Self, CoreError> {
                match value {
                    $( $label => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$($label),+].join(", ")
                    ))),
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $name::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_status_enum! {
    /// Task workflow status.
    TaskStatus {
        Todo = 1 => "TODO",
        InProgress = 2 => "IN_PROGRESS",
        Review = 3 => "REVIEW",
        Testing = 4 => "TESTING",
        Done = 5 => "DONE",
        Cancelled = 6 => "CANCELLED",
    }
}

define_status_enum! {
    /// Time log lifecycle status. APPROVED/REJECTED are set by an external
    /// timesheet workflow.
    TimeLogStatus {
        Running = 1 => "RUNNING",
        Stopped = 2 => "STOPPED",
        Approved = 3 => "APPROVED",
        Rejected = 4 => "REJECTED",
    }
}

define_status_enum! {
    /// Project lifecycle status.
    ProjectStatus {
        Planning = 1 => "PLANNING",
        Active = 2 => "ACTIVE",
        OnHold = 3 => "ON_HOLD",
        Completed = 4 => "COMPLETED",
        Cancelled = 5 => "CANCELLED",
    }
}
