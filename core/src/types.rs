//! Shared primitive types used across the entire crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Internal application identifier.
pub type ApplicationId = i64;

/// Internal loan identifier.
pub type LoanId = i64;

/// The funding partner a loan is channeled to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelingType {
    Bss,
    Dbs,
    Smf,
    Fama,
    Permata,
}

impl ChannelingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bss     => "BSS",
            Self::Dbs     => "DBS",
            Self::Smf     => "SMF",
            Self::Fama    => "FAMA",
            Self::Permata => "PERMATA",
        }
    }
}

impl fmt::Display for ChannelingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BSS"     => Ok(Self::Bss),
            "DBS"     => Ok(Self::Dbs),
            "SMF"     => Ok(Self::Smf),
            "FAMA"    => Ok(Self::Fama),
            "PERMATA" => Ok(Self::Permata),
            other     => Err(format!("unknown channeling type '{other}'")),
        }
    }
}
