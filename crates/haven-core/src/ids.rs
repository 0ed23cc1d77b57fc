//! Strongly typed identifiers shared across the engine's crates.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(TenantId, "Identifier of a tenant that owns private maps.");
string_id!(MapId, "Identifier of a tenant-owned private map.");
string_id!(PublicMapId, "Slug identifying a published public map.");
string_id!(HmapSourceId, "Identifier of an uploaded HMap source file.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_from() {
        let id: PublicMapId = "my-map".into();
        assert_eq!(id.as_str(), "my-map");
        assert_eq!(format!("{id}"), "my-map");
    }
}
