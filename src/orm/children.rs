//! Parsing of embedded child values.
//!
//! Callers hand embedded collections over either as objects carrying the
//! child's own fields or in a compact string form (`10.0.0.1`,
//! `443/tcp`, `10.0.0.1-10.0.0.254`). Both forms end up as a concrete child
//! kind plus a property map ready for insertion.

use std::net::IpAddr;

use serde_json::{Map, Value, json};

use crate::entities::EntityKind;
use crate::error::{DataError, DataResult};
use crate::orm::traits::ChildCollection;

/// One child to create: its kind and its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSpec {
    pub kind: EntityKind,
    pub props: Map<String, Value>,
}

impl ChildCollection {
    /// Parse one supplied value into a child specification.
    pub fn parse(self, field: &str, value: &Value) -> DataResult<ChildSpec> {
        let spec = match (self, value) {
            (ChildCollection::IpAddress, Value::String(text)) => ip_child(field, text)?,
            (ChildCollection::IpAddress, Value::Object(props)) => {
                let text = required_str(field, props, "ip_address_value")?;
                let mut spec = ip_child(field, text)?;
                merge(&mut spec.props, props);
                spec
            }
            (ChildCollection::MacAddress, Value::String(text)) => ChildSpec {
                kind: EntityKind::MacAddress,
                props: object(json!({"mac_address_value": mac_address(field, text)?})),
            },
            (ChildCollection::MacAddress, Value::Object(props)) => {
                let text = required_str(field, props, "mac_address_value")?;
                let mut out = object(json!({"mac_address_value": mac_address(field, text)?}));
                merge(&mut out, props);
                ChildSpec {
                    kind: EntityKind::MacAddress,
                    props: out,
                }
            }
            (ChildCollection::Port, Value::Number(_)) => port_child(field, &value.to_string())?,
            (ChildCollection::Port, Value::String(text)) => port_child(field, text)?,
            (ChildCollection::Port, Value::Object(props)) => {
                if !props.contains_key("port_number") {
                    return Err(DataError::validation(field, "port_number is required"));
                }
                ChildSpec {
                    kind: EntityKind::Port,
                    props: props.clone(),
                }
            }
            (ChildCollection::AddressRange, Value::String(text)) => {
                let (start, end) = text
                    .split_once('-')
                    .ok_or_else(|| DataError::validation(field, "expected 'start-end'"))?;
                range_child(field, start.trim(), end.trim())?
            }
            (ChildCollection::AddressRange, Value::Object(props)) => {
                let start = required_str(field, props, "starting_ip_address")?;
                let end = required_str(field, props, "ending_ip_address")?;
                let mut spec = range_child(field, start, end)?;
                merge(&mut spec.props, props);
                spec
            }
            (_, other) => {
                return Err(DataError::validation(
                    field,
                    format!("unsupported value {}", other),
                ));
            }
        };
        Ok(spec)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Keep the caller's extra child fields without overriding normalised ones.
fn merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        target.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn required_str<'a>(field: &str, props: &'a Map<String, Value>, key: &str) -> DataResult<&'a str> {
    props
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DataError::validation(field, format!("{} is required", key)))
}

fn ip_child(field: &str, text: &str) -> DataResult<ChildSpec> {
    let text = text.trim();
    // CIDR suffixes are kept in the stored value
    let address = text.split('/').next().unwrap_or(text);
    let kind = match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => EntityKind::Ipv4Address,
        Ok(IpAddr::V6(_)) => EntityKind::Ipv6Address,
        Err(_) => {
            return Err(DataError::validation(
                field,
                format!("'{}' is not an IP address", text),
            ));
        }
    };
    Ok(ChildSpec {
        kind,
        props: object(json!({ "ip_address_value": text })),
    })
}

fn mac_address(field: &str, text: &str) -> DataResult<String> {
    let normalized = text.trim().to_ascii_lowercase().replace('-', ":");
    let octets: Vec<&str> = normalized.split(':').collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(normalized)
    } else {
        Err(DataError::validation(
            field,
            format!("'{}' is not a MAC address", text),
        ))
    }
}

fn port_child(field: &str, text: &str) -> DataResult<ChildSpec> {
    let (number, protocol) = match text.trim().split_once('/') {
        Some((number, protocol)) => (number, Some(protocol.trim().to_ascii_lowercase())),
        None => (text.trim(), None),
    };
    let number: u16 = number
        .trim()
        .parse()
        .map_err(|_| DataError::validation(field, format!("'{}' is not a port", text)))?;

    let mut props = object(json!({ "port_number": number }));
    if let Some(protocol) = protocol.filter(|p| !p.is_empty()) {
        props.insert("protocols".to_string(), json!([protocol]));
    }
    Ok(ChildSpec {
        kind: EntityKind::Port,
        props,
    })
}

fn range_child(field: &str, start: &str, end: &str) -> DataResult<ChildSpec> {
    for address in [start, end] {
        address.parse::<IpAddr>().map_err(|_| {
            DataError::validation(field, format!("'{}' is not an IP address", address))
        })?;
    }
    Ok(ChildSpec {
        kind: EntityKind::IpAddressRange,
        props: object(json!({
            "starting_ip_address": start,
            "ending_ip_address": end,
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_ip_addresses_pick_their_family() {
        let v4 = ChildCollection::IpAddress
            .parse("ip_address", &json!("10.0.0.1"))
            .unwrap();
        assert_eq!(v4.kind, EntityKind::Ipv4Address);

        let v6 = ChildCollection::IpAddress
            .parse("ip_address", &json!({"ip_address_value": "fe80::1"}))
            .unwrap();
        assert_eq!(v6.kind, EntityKind::Ipv6Address);

        assert_matches!(
            ChildCollection::IpAddress.parse("ip_address", &json!("300.1.1.1")),
            Err(DataError::Validation { .. })
        );
    }

    #[test]
    fn test_mac_addresses_are_normalised() {
        let mac = ChildCollection::MacAddress
            .parse("mac_address", &json!("AA-BB-CC-DD-EE-FF"))
            .unwrap();
        assert_eq!(mac.props["mac_address_value"], json!("aa:bb:cc:dd:ee:ff"));
        assert!(
            ChildCollection::MacAddress
                .parse("mac_address", &json!("aa:bb"))
                .is_err()
        );
    }

    #[test]
    fn test_port_forms() {
        let port = ChildCollection::Port.parse("ports", &json!("443/TCP")).unwrap();
        assert_eq!(port.props["port_number"], json!(443));
        assert_eq!(port.props["protocols"], json!(["tcp"]));

        let bare = ChildCollection::Port.parse("ports", &json!(22)).unwrap();
        assert_eq!(bare.props["port_number"], json!(22));

        assert!(ChildCollection::Port.parse("ports", &json!({"protocols": ["udp"]})).is_err());
    }

    #[test]
    fn test_address_range_forms() {
        let range = ChildCollection::AddressRange
            .parse("network_address_range", &json!("10.0.0.1 - 10.0.0.254"))
            .unwrap();
        assert_eq!(range.props["ending_ip_address"], json!("10.0.0.254"));
        assert!(
            ChildCollection::AddressRange
                .parse("network_address_range", &json!("10.0.0.1"))
                .is_err()
        );
    }
}
