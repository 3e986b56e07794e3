//! Allow and no-proxy rule sets.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// A single IPv4 match rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpRule {
    /// `10.1.2.3`
    Single(Ipv4Addr),
    /// `10.0.0.0/8`
    Cidr { network: u32, prefix: u8 },
    /// `10.0.0.1-10.0.0.50`
    Range { start: u32, end: u32 },
    /// `192.168.*.*`, `None` octets match anything.
    Glob([Option<u8>; 4]),
}

impl IpRule {
    fn parse(rule: &str) -> Option<Self> {
        if let Some((net, prefix)) = rule.split_once('/') {
            let net: Ipv4Addr = net.parse().ok()?;
            let prefix: u8 = prefix.parse().ok()?;
            if prefix > 32 {
                return None;
            }
            let mask = mask(prefix);
            return Some(IpRule::Cidr {
                network: u32::from(net) & mask,
                prefix,
            });
        }

        if let Some((start, end)) = rule.split_once('-') {
            let start: Ipv4Addr = start.trim().parse().ok()?;
            let end: Ipv4Addr = end.trim().parse().ok()?;
            let (start, end) = (u32::from(start), u32::from(end));
            if start > end {
                return None;
            }
            return Some(IpRule::Range { start, end });
        }

        if rule.contains('*') {
            let octets: Vec<&str> = rule.split('.').collect();
            if octets.len() != 4 {
                return None;
            }
            let mut glob = [None; 4];
            for (slot, octet) in glob.iter_mut().zip(octets) {
                *slot = match octet {
                    "*" => None,
                    n => Some(n.parse().ok()?),
                };
            }
            return Some(IpRule::Glob(glob));
        }

        rule.parse().ok().map(IpRule::Single)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let value = u32::from(ip);
        match self {
            IpRule::Single(addr) => *addr == ip,
            IpRule::Cidr { network, prefix } => value & mask(*prefix) == *network,
            IpRule::Range { start, end } => (*start..=*end).contains(&value),
            IpRule::Glob(glob) => glob
                .iter()
                .zip(ip.octets())
                .all(|(want, got)| want.map_or(true, |w| w == got)),
        }
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

/// A hostname match rule (no-proxy lists only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRule {
    Exact(String),
    /// `*.example.com` or `.example.com`: the domain and everything below it.
    Suffix(String),
}

impl HostRule {
    fn parse(rule: &str) -> Option<Self> {
        let rule = rule.to_ascii_lowercase();
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        };
        if let Some(domain) = rule.strip_prefix("*.").or_else(|| rule.strip_prefix('.')) {
            return valid(domain).then(|| HostRule::Suffix(domain.to_string()));
        }
        valid(&rule).then_some(HostRule::Exact(rule))
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self {
            HostRule::Exact(name) => host == *name,
            HostRule::Suffix(domain) => {
                host == *domain || host.ends_with(&format!(".{}", domain))
            }
        }
    }
}

/// A parsed allow or no-proxy list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    ips: Vec<IpRule>,
    hosts: Vec<HostRule>,
}

impl RuleSet {
    /// Parse a comma, semicolon or whitespace separated list of rules.
    ///
    /// With `ip_only` set, hostname rules are rejected.
    pub fn parse(rules: &str, ip_only: bool) -> Result<Self> {
        let mut set = RuleSet::default();
        for rule in rules
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|r| !r.is_empty())
        {
            if let Some(ip) = IpRule::parse(rule) {
                set.ips.push(ip);
            } else if ip_only {
                return Err(Error::InvalidRule(format!("Bad IP definition: {}", rule)));
            } else if let Some(host) = HostRule::parse(rule) {
                set.hosts.push(host);
            } else {
                return Err(Error::InvalidRule(rule.to_string()));
            }
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty() && self.hosts.is_empty()
    }

    pub fn ip_rules(&self) -> &[IpRule] {
        &self.ips
    }

    pub fn host_rules(&self) -> &[HostRule] {
        &self.hosts
    }

    pub fn contains_ip(&self, ip: Ipv4Addr) -> bool {
        self.ips.iter().any(|r| r.contains(ip))
    }

    /// Match a host given as a name or a dotted IPv4 literal.
    pub fn matches(&self, host: &str) -> bool {
        match host.parse::<Ipv4Addr>() {
            Ok(ip) => self.contains_ip(ip),
            Err(_) => self.hosts.iter().any(|r| r.matches(host)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_wide_open_glob() {
        let set = RuleSet::parse("*.*.*.*", true).unwrap();
        assert!(set.contains_ip(ip("8.8.8.8")));
        assert!(set.contains_ip(ip("127.0.0.1")));
    }

    #[test]
    fn test_mixed_ip_rules() {
        let set = RuleSet::parse("10.0.0.0/8, 192.168.1.10-192.168.1.20;172.16.*.*", true).unwrap();
        assert_eq!(set.ip_rules().len(), 3);
        assert!(set.contains_ip(ip("10.200.3.4")));
        assert!(set.contains_ip(ip("192.168.1.15")));
        assert!(!set.contains_ip(ip("192.168.1.21")));
        assert!(set.contains_ip(ip("172.16.9.9")));
        assert!(!set.contains_ip(ip("172.17.0.1")));
    }

    #[test]
    fn test_ip_only_rejects_hostnames() {
        let err = RuleSet::parse("10.0.0.1,example.com", true).unwrap_err();
        assert!(matches!(err, Error::InvalidRule(_)));
    }

    #[test]
    fn test_noproxy_hosts() {
        let set = RuleSet::parse("localhost, *.corp.example.com, 127.0.0.1", false).unwrap();
        assert!(set.matches("LOCALHOST"));
        assert!(set.matches("build.corp.example.com"));
        assert!(set.matches("corp.example.com"));
        assert!(!set.matches("example.com"));
        assert!(set.matches("127.0.0.1"));
    }

    #[test]
    fn test_empty_rules() {
        let set = RuleSet::parse("", true).unwrap();
        assert!(set.is_empty());
        assert!(!set.contains_ip(ip("127.0.0.1")));
    }

    #[test]
    fn test_bad_cidr() {
        assert!(RuleSet::parse("10.0.0.0/40", true).is_err());
        assert!(RuleSet::parse("10.0.0.9-10.0.0.1", true).is_err());
    }
}
