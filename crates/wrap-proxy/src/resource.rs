//! Addon resource categories served through the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceName {
    Catalog,
    AddonCatalog,
    Meta,
    Stream,
    Subtitles,
}

impl ResourceName {
    pub const ALL: [ResourceName; 5] = [
        ResourceName::Catalog,
        ResourceName::AddonCatalog,
        ResourceName::Meta,
        ResourceName::Stream,
        ResourceName::Subtitles,
    ];

    /// The path segment used by the addon protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceName::Catalog => "catalog",
            ResourceName::AddonCatalog => "addon_catalog",
            ResourceName::Meta => "meta",
            ResourceName::Stream => "stream",
            ResourceName::Subtitles => "subtitles",
        }
    }

    /// Whether requests for this resource may carry an extra-args segment.
    pub fn accepts_extra(self) -> bool {
        matches!(self, ResourceName::Catalog | ResourceName::Subtitles)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource {0:?}")]
pub struct UnknownResource(pub String);

impl FromStr for ResourceName {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceName::ALL
            .into_iter()
            .find(|resource| resource.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments_parse_back() {
        for resource in ResourceName::ALL {
            assert_eq!(resource.as_str().parse::<ResourceName>().unwrap(), resource);
        }
    }

    #[test]
    fn test_unknown_resource() {
        assert_eq!(
            "manifest".parse::<ResourceName>(),
            Err(UnknownResource("manifest".to_string()))
        );
        assert!("Catalog".parse::<ResourceName>().is_err());
    }

    #[test]
    fn test_serde_matches_path_segment() {
        let json = serde_json::to_string(&ResourceName::AddonCatalog).unwrap();
        assert_eq!(json, "\"addon_catalog\"");
    }
}
