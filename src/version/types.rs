//! Record types shared by the store, the resolver and the compatibility layer

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Release channel a version was published on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Release,
    Beta,
    Alpha,
}

impl ReleaseChannel {
    /// Returns the string representation used by the catalog and the store
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseChannel::Release => "release",
            ReleaseChannel::Beta => "beta",
            ReleaseChannel::Alpha => "alpha",
        }
    }
}

impl FromStr for ReleaseChannel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(ReleaseChannel::Release),
            "beta" => Ok(ReleaseChannel::Beta),
            "alpha" => Ok(ReleaseChannel::Alpha),
            _ => Err(()),
        }
    }
}

/// A structurally valid project version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub version_number: String,
    /// Never empty
    pub loaders: Vec<String>,
    /// Never empty
    pub game_versions: Vec<String>,
    /// Version ids this version requires
    pub dependencies: Vec<String>,
    pub channel: ReleaseChannel,
    pub published: DateTime<Utc>,
}

impl VersionRecord {
    /// Identity-only record used when this version gets demoted
    pub fn to_invalid(&self) -> InvalidVersionRecord {
        InvalidVersionRecord {
            id: self.id.clone(),
            project_id: Some(self.project_id.clone()),
        }
    }
}

/// A version that failed validation, could not be found, or depends on such a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InvalidVersionRecord {
    pub id: String,
    pub project_id: Option<String>,
}

impl InvalidVersionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("release", Ok(ReleaseChannel::Release))]
    #[case("beta", Ok(ReleaseChannel::Beta))]
    #[case("alpha", Ok(ReleaseChannel::Alpha))]
    #[case("Release", Err(()))]
    #[case("snapshot", Err(()))]
    fn release_channel_from_str_returns_expected(
        #[case] input: &str,
        #[case] expected: Result<ReleaseChannel, ()>,
    ) {
        assert_eq!(input.parse::<ReleaseChannel>(), expected);
    }

    #[test]
    fn release_channel_as_str_matches_from_str() {
        for channel in [
            ReleaseChannel::Release,
            ReleaseChannel::Beta,
            ReleaseChannel::Alpha,
        ] {
            assert_eq!(channel.as_str().parse::<ReleaseChannel>(), Ok(channel));
        }
    }
}
