use crate::error::ApiError;
use std::fmt;
use std::str::FromStr;

/// Path prefix shared by every service of the property API.
pub const PATH_PREFIX: &str = "/propertyapi/v1.0.0/";

/// One of the fixed services exposed by the property API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Id,
    Basic,
    Detail,
    Snapshot,
    Address,
    Sales,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Id,
        Endpoint::Basic,
        Endpoint::Detail,
        Endpoint::Snapshot,
        Endpoint::Address,
        Endpoint::Sales,
    ];

    /// Short alias used in config files and on the command line.
    pub fn alias(&self) -> &'static str {
        match self {
            Endpoint::Id => "id",
            Endpoint::Basic => "basic",
            Endpoint::Detail => "detail",
            Endpoint::Snapshot => "snapshot",
            Endpoint::Address => "address",
            Endpoint::Sales => "sales",
        }
    }

    /// Service suffix appended to [`PATH_PREFIX`].
    pub fn suffix(&self) -> &'static str {
        match self {
            Endpoint::Id => "property/id",
            Endpoint::Basic => "property/basicprofile",
            Endpoint::Detail => "property/detail",
            Endpoint::Snapshot => "property/snapshot",
            Endpoint::Address => "property/address",
            Endpoint::Sales => "sale/snapshot",
        }
    }

    /// Full request path for this service.
    pub fn path(&self) -> String {
        format!("{}{}", PATH_PREFIX, self.suffix())
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        Endpoint::ALL
            .into_iter()
            .find(|e| e.alias().eq_ignore_ascii_case(alias))
    }
}

impl FromStr for Endpoint {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::from_alias(s).ok_or_else(|| ApiError::UnknownEndpoint(s.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// Lenient path builder: an unknown alias (including the empty string)
/// warns and falls back to the bare prefix instead of failing.
pub fn service_path(alias: &str) -> String {
    match Endpoint::from_alias(alias) {
        Some(endpoint) => endpoint.path(),
        None => {
            eprintln!("Warning: Invalid search option: {:?}", alias);
            PATH_PREFIX.to_string()
        }
    }
}
