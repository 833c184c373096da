//! Endpoint Identifiers: the `dtn` and `ipn` URI schemes used to name
//! bundle sources, destinations, and report-to endpoints.

use dtn_cbor::decode::Value;
use thiserror::Error as ThisError;

/// Errors raised while parsing or validating an endpoint identifier.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("unrecognised EID scheme {0}")]
    UnknownScheme(String),

    #[error("unrecognised EID scheme number {0}")]
    UnknownSchemeNumber(u64),

    #[error("invalid dtn node name {0:?}")]
    InvalidNodeName(String),

    #[error("ipn node and service numbers must be non-zero")]
    IpnZeroComponent,

    #[error("malformed ipn EID {0:?}")]
    MalformedIpn(String),

    #[error("malformed dtn EID {0:?}")]
    MalformedDtn(String),

    #[error(transparent)]
    InvalidCbor(#[from] dtn_cbor::decode::Error),
}

/// The `dtn` scheme endpoint: either the null endpoint `dtn:none` or a
/// `//node-name/demux` authority-and-path form.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DtnEndpoint {
    Null,
    NodeName { node_name: String, demux: String },
}

impl DtnEndpoint {
    fn is_valid_node_name(s: &str) -> bool {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    /// Parses the scheme-specific part of a `dtn` authority form, i.e. the
    /// text `//node-name/demux` as it appears on the wire and after the
    /// `dtn:` prefix in a URI.
    fn parse_authority(s: &str) -> Result<Self, Error> {
        let rest = s
            .strip_prefix("//")
            .ok_or_else(|| Error::MalformedDtn(s.to_string()))?;
        let (node_name, demux) = match rest.split_once('/') {
            Some((n, d)) => (n, d),
            None => (rest, ""),
        };
        if !Self::is_valid_node_name(node_name) {
            return Err(Error::InvalidNodeName(node_name.to_string()));
        }
        Ok(Self::NodeName {
            node_name: node_name.to_string(),
            demux: demux.to_string(),
        })
    }

    pub fn is_singleton(&self) -> bool {
        match self {
            DtnEndpoint::Null => false,
            DtnEndpoint::NodeName { demux, .. } => !demux.starts_with('~'),
        }
    }
}

impl core::fmt::Display for DtnEndpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DtnEndpoint::Null => write!(f, "dtn:none"),
            DtnEndpoint::NodeName { node_name, demux } => write!(f, "dtn://{node_name}/{demux}"),
        }
    }
}

/// The `ipn` scheme endpoint: a `(node, service)` pair, both non-zero.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IpnEndpoint {
    pub node: u64,
    pub service: u64,
}

impl IpnEndpoint {
    pub fn new(node: u64, service: u64) -> Result<Self, Error> {
        if node == 0 || service == 0 {
            return Err(Error::IpnZeroComponent);
        }
        Ok(Self { node, service })
    }
}

impl core::fmt::Display for IpnEndpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ipn:{}.{}", self.node, self.service)
    }
}

/// An endpoint identifier: either a `dtn` or an `ipn` scheme endpoint.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Eid {
    Dtn(DtnEndpoint),
    Ipn(IpnEndpoint),
}

/// Orders by the rendered `scheme_name:scheme_ssp` string, lexicographically,
/// rather than by enum variant or field order (which would place, e.g.,
/// `dtn:none` after every `dtn://node/demux` form).
impl PartialOrd for Eid {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Eid {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl Eid {
    /// The well-known null endpoint, `dtn:none`.
    pub fn null() -> Self {
        Eid::Dtn(DtnEndpoint::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Eid::Dtn(DtnEndpoint::Null))
    }

    /// `true` if this endpoint can be delivered to at most one node.
    pub fn is_singleton(&self) -> bool {
        match self {
            Eid::Dtn(d) => d.is_singleton(),
            Eid::Ipn(_) => true,
        }
    }

    /// `true` if `self` and `other` name the same node, ignoring the
    /// service/demux component (a `dtn` node-name match, or an `ipn` node
    /// number match).
    pub fn is_same_node(&self, other: &Eid) -> bool {
        match (self, other) {
            (Eid::Dtn(DtnEndpoint::NodeName { node_name: a, .. }), Eid::Dtn(DtnEndpoint::NodeName { node_name: b, .. })) => {
                a == b
            }
            (Eid::Ipn(a), Eid::Ipn(b)) => a.node == b.node,
            _ => false,
        }
    }

    fn scheme_number(&self) -> u64 {
        match self {
            Eid::Dtn(_) => 1,
            Eid::Ipn(_) => 2,
        }
    }
}

impl core::fmt::Display for Eid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Eid::Dtn(d) => d.fmt(f),
            Eid::Ipn(i) => i.fmt(f),
        }
    }
}

impl core::str::FromStr for Eid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((scheme, rest)) = s.split_once(':') else {
            return Err(Error::UnknownScheme(s.to_string()));
        };
        match scheme {
            "dtn" => {
                if rest == "none" {
                    Ok(Eid::Dtn(DtnEndpoint::Null))
                } else {
                    Ok(Eid::Dtn(DtnEndpoint::parse_authority(rest)?))
                }
            }
            "ipn" => {
                let (node, service) = rest
                    .split_once('.')
                    .ok_or_else(|| Error::MalformedIpn(s.to_string()))?;
                let node: u64 = node.parse().map_err(|_| Error::MalformedIpn(s.to_string()))?;
                let service: u64 = service
                    .parse()
                    .map_err(|_| Error::MalformedIpn(s.to_string()))?;
                Ok(Eid::Ipn(IpnEndpoint::new(node, service)?))
            }
            other => Err(Error::UnknownScheme(other.to_string())),
        }
    }
}

impl dtn_cbor::encode::ToCbor for Eid {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit_array(Some(2), |a| {
            a.emit(&self.scheme_number());
            match self {
                Eid::Dtn(DtnEndpoint::Null) => {
                    a.emit(&0u64);
                }
                Eid::Dtn(DtnEndpoint::NodeName { node_name, demux }) => {
                    a.emit(&format!("//{node_name}/{demux}"));
                }
                Eid::Ipn(ipn) => {
                    a.emit_array(Some(2), |inner| {
                        inner.emit(&ipn.node);
                        inner.emit(&ipn.service);
                    });
                }
            }
        })
    }
}

impl dtn_cbor::decode::FromCbor for Eid {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        dtn_cbor::decode::parse_array(data, |a, shortest, tags| {
            let (scheme, s1) = a.parse::<u64>()?;
            let ((eid, s2), _) = a.parse_value(|value, shortest, tags| {
                let shortest = shortest && tags.is_empty();
                match (scheme, value) {
                    (1, Value::UnsignedInteger(0)) => Ok((Eid::Dtn(DtnEndpoint::Null), shortest)),
                    (1, Value::Text(s)) => {
                        Ok((Eid::Dtn(DtnEndpoint::parse_authority(s)?), shortest))
                    }
                    (2, Value::Array(inner)) => {
                        let (node, sn) = inner.parse::<u64>()?;
                        let (service, ss) = inner.parse::<u64>()?;
                        Ok((
                            Eid::Ipn(IpnEndpoint::new(node, service)?),
                            shortest && inner.is_definite() && sn && ss,
                        ))
                    }
                    (n, _) => Err(Error::UnknownSchemeNumber(n)),
                }
            })?;
            Ok::<_, Error>((eid, shortest && tags.is_empty() && a.is_definite() && s1 && s2))
        })
        .map(|((v, s), len)| (v, s, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn ipn_round_trips_cbor() {
        let eid = Eid::from_str("ipn:23.42").unwrap();
        let (_, data) = dtn_cbor::encode::emit(&eid);
        assert_eq!(data, vec![0x82, 0x02, 0x82, 0x17, 0x18, 0x2A]);
        let decoded: Eid = dtn_cbor::decode::parse(&data).unwrap();
        assert_eq!(decoded, eid);
    }

    #[test]
    fn dtn_none_round_trips_cbor() {
        let eid = Eid::from_str("dtn:none").unwrap();
        let (_, data) = dtn_cbor::encode::emit(&eid);
        assert_eq!(data, vec![0x82, 0x01, 0x00]);
        assert!(eid.is_null());
        assert!(!eid.is_singleton());
    }

    #[test]
    fn dtn_node_round_trips_cbor() {
        let eid = Eid::from_str("dtn://foo/bar").unwrap();
        let (_, data) = dtn_cbor::encode::emit(&eid);
        assert_eq!(
            data,
            vec![0x82, 0x01, 0x69, 0x2F, 0x2F, 0x66, 0x6F, 0x6F, 0x2F, 0x62, 0x61, 0x72]
        );
        assert_eq!(eid.to_string(), "dtn://foo/bar");
        assert!(eid.is_singleton());
    }

    #[test]
    fn tilde_demux_is_not_singleton() {
        let eid = Eid::from_str("dtn://foo/~bar").unwrap();
        assert!(!eid.is_singleton());
    }

    #[test]
    fn ipn_rejects_zero_components() {
        assert!(Eid::from_str("ipn:0.1").is_err());
        assert!(Eid::from_str("ipn:1.0").is_err());
    }

    #[test]
    fn orders_lexicographically_by_rendered_string() {
        let none = Eid::from_str("dtn:none").unwrap();
        let foo_bar = Eid::from_str("dtn://foo/bar").unwrap();
        // "dtn://foo/bar" < "dtn:none" because '/' (0x2F) < 'n' (0x6E).
        assert!(foo_bar < none);

        let a = Eid::from_str("dtn://a/x").unwrap();
        let a_b = Eid::from_str("dtn://a-b/x").unwrap();
        // "dtn://a-b/x" < "dtn://a/x" because '-' (0x2D) < '/' (0x2F) at
        // the byte where the two node names diverge.
        assert!(a_b < a);
    }

    #[test]
    fn same_node_ignores_service_and_demux() {
        let a = Eid::from_str("ipn:23.1").unwrap();
        let b = Eid::from_str("ipn:23.2").unwrap();
        assert!(a.is_same_node(&b));

        let c = Eid::from_str("dtn://foo/a").unwrap();
        let d = Eid::from_str("dtn://foo/b").unwrap();
        assert!(c.is_same_node(&d));
    }
}
