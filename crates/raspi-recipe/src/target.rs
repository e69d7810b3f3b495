//! Supported build targets: a Raspberry Pi revision paired with a Debian release.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Revision {
    #[serde(rename = "1")]
    Pi1,
    #[serde(rename = "2")]
    Pi2,
    #[serde(rename = "3")]
    Pi3,
    #[serde(rename = "4")]
    Pi4,
}

impl Revision {
    pub const ALL: [Revision; 4] = [Revision::Pi1, Revision::Pi2, Revision::Pi3, Revision::Pi4];

    pub fn as_str(self) -> &'static str {
        match self {
            Revision::Pi1 => "1",
            Revision::Pi2 => "2",
            Revision::Pi3 => "3",
            Revision::Pi4 => "4",
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Revision::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::domain(format!("unsupported version {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Release {
    Buster,
    Bullseye,
    Bookworm,
}

impl Release {
    /// Ordered oldest first.
    pub const ALL: [Release; 3] = [Release::Buster, Release::Bullseye, Release::Bookworm];

    pub fn as_str(self) -> &'static str {
        match self {
            Release::Buster => "buster",
            Release::Bullseye => "bullseye",
            Release::Bookworm => "bookworm",
        }
    }

    pub fn is_oldest(self) -> bool {
        self == Release::ALL[0]
    }

    pub fn backports_suite(self) -> String {
        format!("{}-backports", self.as_str())
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Release {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Release::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::domain(format!("unsupported suite {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub revision: Revision,
    pub release: Release,
}

impl Target {
    pub fn new(revision: Revision, release: Release) -> Self {
        Self { revision, release }
    }

    /// Validate raw CLI values. Revision is checked first.
    pub fn parse(revision: &str, release: &str) -> Result<Self> {
        Ok(Self {
            revision: revision.parse()?,
            release: release.parse()?,
        })
    }

    /// Every supported combination, revision-major.
    pub fn all() -> impl Iterator<Item = Target> {
        Revision::ALL
            .into_iter()
            .flat_map(|rev| Release::ALL.into_iter().map(move |rel| Target::new(rev, rel)))
    }

    pub fn recipe_file_name(&self) -> String {
        format!("raspi_{}_{}.yaml", self.revision, self.release)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raspi {} / {}", self.revision, self.release)
    }
}
