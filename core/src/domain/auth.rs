//! Upstream proxy authentication schemes.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Authentication scheme the transport negotiates with the upstream proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// Any scheme the upstream offers.
    #[default]
    Any,
    /// Any scheme except Basic.
    AnySafe,
    Ntlm,
    Negotiate,
    Digest,
    DigestIe,
    NtlmWb,
    Basic,
    /// Disable authentication.
    None,
}

impl AuthScheme {
    pub fn name(self) -> &'static str {
        match self {
            AuthScheme::Any => "ANY",
            AuthScheme::AnySafe => "ANYSAFE",
            AuthScheme::Ntlm => "NTLM",
            AuthScheme::Negotiate => "NEGOTIATE",
            AuthScheme::Digest => "DIGEST",
            AuthScheme::DigestIe => "DIGEST_IE",
            AuthScheme::NtlmWb => "NTLM_WB",
            AuthScheme::Basic => "BASIC",
            AuthScheme::None => "NONE",
        }
    }

    /// Whether credentials are sent in clear text.
    pub fn is_cleartext(self) -> bool {
        matches!(self, AuthScheme::Basic | AuthScheme::Any)
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthScheme {
    type Err = Error;

    /// Empty input selects [`AuthScheme::Any`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let scheme = match value.trim().to_ascii_uppercase().as_str() {
            "" | "ANY" => AuthScheme::Any,
            "ANYSAFE" => AuthScheme::AnySafe,
            "NTLM" => AuthScheme::Ntlm,
            "NEGOTIATE" => AuthScheme::Negotiate,
            "DIGEST" => AuthScheme::Digest,
            "DIGEST_IE" => AuthScheme::DigestIe,
            "NTLM_WB" => AuthScheme::NtlmWb,
            "BASIC" => AuthScheme::Basic,
            "NONE" => AuthScheme::None,
            _ => return Err(Error::UnsupportedAuth(value.to_string())),
        };
        Ok(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schemes() {
        assert_eq!("".parse::<AuthScheme>().unwrap(), AuthScheme::Any);
        assert_eq!("ntlm".parse::<AuthScheme>().unwrap(), AuthScheme::Ntlm);
        assert_eq!(" Negotiate ".parse::<AuthScheme>().unwrap(), AuthScheme::Negotiate);
        assert_eq!("DIGEST_IE".parse::<AuthScheme>().unwrap(), AuthScheme::DigestIe);
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = "KERBEROS".parse::<AuthScheme>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedAuth(s) if s == "KERBEROS"));
    }
}
