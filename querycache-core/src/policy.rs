//! Fetch policies and network status codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-selected strategy for trading cache freshness against network cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Never hit the network. Fails when no complete entry exists.
    CacheOnly,
    /// Serve a complete entry without a network call, otherwise fetch.
    CacheFirst,
    /// Serve any cached value immediately, then always refresh.
    #[default]
    CacheAndNetwork,
    /// Always fetch. Results are still written into the cache.
    NetworkOnly,
}

impl FetchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheOnly => "cache-only",
            Self::CacheFirst => "cache-first",
            Self::CacheAndNetwork => "cache-and-network",
            Self::NetworkOnly => "network-only",
        }
    }

    /// Returns true if this policy can ever issue a network request.
    pub fn uses_network(&self) -> bool {
        !matches!(self, Self::CacheOnly)
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cache-only" => Ok(Self::CacheOnly),
            "cache-first" => Ok(Self::CacheFirst),
            "cache-and-network" => Ok(Self::CacheAndNetwork),
            "network-only" => Ok(Self::NetworkOnly),
            other => Err(format!("unknown fetch policy: {}", other)),
        }
    }
}

/// Progress stage of a fetch, using the numeric codes GraphQL clients expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum NetworkStatus {
    /// Initial fetch with nothing to show yet.
    Loading = 1,
    /// Refetching while cached data is shown.
    Refetch = 3,
    /// Settled.
    Ready = 7,
}

impl NetworkStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_in_flight(self) -> bool {
        !matches!(self, Self::Ready)
    }
}

impl From<NetworkStatus> for u8 {
    fn from(status: NetworkStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for NetworkStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Loading),
            3 => Ok(Self::Refetch),
            7 => Ok(Self::Ready),
            other => Err(format!("unsupported network status code: {}", other)),
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
