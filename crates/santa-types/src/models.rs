use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an exchange event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Locked,
}

/// When a participant may see who they are buying for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealMode {
    /// Disclosed once the event date has passed, locked or not.
    #[default]
    OnDate,
    /// Disclosed as soon as the organizer seals the assignments.
    OnLock,
}

/// Account role. Only admins may organize events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(EventStatus { Draft => "draft", Locked => "locked" });
string_enum!(RevealMode { OnDate => "on_date", OnLock => "on_lock" });
string_enum!(Role { Admin => "admin", User => "user" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_matches_serde() {
        assert_eq!(
            serde_json::to_string(&RevealMode::OnLock).unwrap(),
            format!("\"{}\"", RevealMode::OnLock.as_str())
        );
        assert_eq!("locked".parse::<EventStatus>().unwrap(), EventStatus::Locked);
        assert!("sealed".parse::<EventStatus>().is_err());
    }
}
