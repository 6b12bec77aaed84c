//! Entity kinds of the asset inventory and their predicate maps.
//!
//! [EntityKind] is the primary type discriminator. The per-kind predicate
//! tables are plain statics; [EntityKind::predicate_map] hands out the
//! indexed [PredicateMap] built once on first use and shared read-only by
//! every request afterwards.

mod address;
mod asset;
mod hardware;
pub mod legacy;
mod network;
mod port;
mod software;
pub mod vocab;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::orm::PredicateMap;
use vocab::*;

/// Every kind of entity the layer knows how to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Any inventory asset; list-only, resolved to a concrete kind per row
    Asset,
    Software,
    OperatingSystem,
    Hardware,
    Network,
    Ipv4Address,
    Ipv6Address,
    MacAddress,
    Port,
    IpAddressRange,
}

/// Process-wide registry of indexed predicate maps.
static PREDICATE_MAPS: Lazy<HashMap<EntityKind, PredicateMap>> = Lazy::new(|| {
    EntityKind::ALL
        .iter()
        .map(|&kind| (kind, PredicateMap::new(kind, kind.descriptors())))
        .collect()
});

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Asset,
        EntityKind::Software,
        EntityKind::OperatingSystem,
        EntityKind::Hardware,
        EntityKind::Network,
        EntityKind::Ipv4Address,
        EntityKind::Ipv6Address,
        EntityKind::MacAddress,
        EntityKind::Port,
        EntityKind::IpAddressRange,
    ];

    /// Kinds that belong to the asset inventory.
    pub const INVENTORY: [EntityKind; 4] = [
        EntityKind::Software,
        EntityKind::OperatingSystem,
        EntityKind::Hardware,
        EntityKind::Network,
    ];

    /// The `object_type` value stored on entities of this kind.
    pub fn object_type(self) -> &'static str {
        match self {
            EntityKind::Asset => "asset",
            EntityKind::Software => "software",
            EntityKind::OperatingSystem => "operating-system",
            EntityKind::Hardware => "hardware",
            EntityKind::Network => "network",
            EntityKind::Ipv4Address => "ipv4-addr",
            EntityKind::Ipv6Address => "ipv6-addr",
            EntityKind::MacAddress => "mac-addr",
            EntityKind::Port => "port",
            EntityKind::IpAddressRange => "ip-addr-range",
        }
    }

    /// Parse an explicit `object_type` discriminator.
    pub fn from_object_type(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "asset" => Some(EntityKind::Asset),
            "software" => Some(EntityKind::Software),
            "operating-system" => Some(EntityKind::OperatingSystem),
            "hardware" | "computing-device" => Some(EntityKind::Hardware),
            "network" => Some(EntityKind::Network),
            "ipv4-addr" => Some(EntityKind::Ipv4Address),
            "ipv6-addr" => Some(EntityKind::Ipv6Address),
            "mac-addr" => Some(EntityKind::MacAddress),
            "port" => Some(EntityKind::Port),
            "ip-addr-range" => Some(EntityKind::IpAddressRange),
            _ => None,
        }
    }

    /// Infer a kind from the `asset_type` enumeration.
    pub fn from_asset_type(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "software" | "application_software" => Some(EntityKind::Software),
            "operating_system" => Some(EntityKind::OperatingSystem),
            "network" => Some(EntityKind::Network),
            "hardware" | "physical_device" | "computing_device" | "server" | "workstation"
            | "laptop" | "mobile_device" | "router" | "switch" | "firewall" | "storage_array"
            | "embedded" | "voip_handset" | "voip_router" | "network_device" | "printer" => {
                Some(EntityKind::Hardware)
            }
            _ => None,
        }
    }

    /// RDF classes asserted on creation; the first is used to select the kind.
    pub fn classes(self) -> &'static [&'static str] {
        match self {
            EntityKind::Asset => &[CLASS_ASSET],
            EntityKind::Software => &[CLASS_SOFTWARE, CLASS_IT_ASSET, CLASS_ASSET, CLASS_OBJECT],
            EntityKind::OperatingSystem => &[
                CLASS_OPERATING_SYSTEM,
                CLASS_SOFTWARE,
                CLASS_IT_ASSET,
                CLASS_ASSET,
                CLASS_OBJECT,
            ],
            EntityKind::Hardware => &[
                CLASS_HARDWARE,
                CLASS_COMPUTING_DEVICE,
                CLASS_IT_ASSET,
                CLASS_ASSET,
                CLASS_OBJECT,
            ],
            EntityKind::Network => &[CLASS_NETWORK, CLASS_IT_ASSET, CLASS_ASSET, CLASS_OBJECT],
            EntityKind::Ipv4Address => &[CLASS_IPV4_ADDRESS, CLASS_IP_ADDRESS, CLASS_OBJECT],
            EntityKind::Ipv6Address => &[CLASS_IPV6_ADDRESS, CLASS_IP_ADDRESS, CLASS_OBJECT],
            EntityKind::MacAddress => &[CLASS_MAC_ADDRESS, CLASS_OBJECT],
            EntityKind::Port => &[CLASS_PORT, CLASS_OBJECT],
            EntityKind::IpAddressRange => &[CLASS_IP_ADDRESS_RANGE, CLASS_OBJECT],
        }
    }

    pub fn primary_class(self) -> &'static str {
        self.classes()[0]
    }

    /// IRI local-name prefix for entities of this kind. Abstract kinds have none.
    pub fn namespace_segment(self) -> Option<&'static str> {
        match self {
            EntityKind::Asset => None,
            EntityKind::Software => Some("Software-"),
            EntityKind::OperatingSystem => Some("OperatingSystem-"),
            EntityKind::Hardware => Some("Hardware-"),
            EntityKind::Network => Some("Network-"),
            EntityKind::Ipv4Address => Some("IpV4Address-"),
            EntityKind::Ipv6Address => Some("IpV6Address-"),
            EntityKind::MacAddress => Some("MACAddress-"),
            EntityKind::Port => Some("Port-"),
            EntityKind::IpAddressRange => Some("IpAddressRange-"),
        }
    }

    /// Build the IRI for a public id.
    pub fn iri_for(self, id: &str) -> Option<String> {
        self.namespace_segment()
            .map(|segment| format!("{}{}{}", ASSET_NS, segment, id))
    }

    /// Whether an IRI lives in this kind's namespace.
    pub fn owns_iri(self, iri: &str) -> bool {
        match self.namespace_segment() {
            Some(segment) => iri
                .strip_prefix(ASSET_NS)
                .is_some_and(|local| local.starts_with(segment)),
            None => false,
        }
    }

    pub fn is_abstract(self) -> bool {
        self == EntityKind::Asset
    }

    /// Kinds a row of this kind may turn out to be.
    pub fn concrete_kinds(self) -> &'static [EntityKind] {
        match self {
            EntityKind::Asset => &Self::INVENTORY,
            EntityKind::Software => &[EntityKind::Software],
            EntityKind::OperatingSystem => &[EntityKind::OperatingSystem],
            EntityKind::Hardware => &[EntityKind::Hardware],
            EntityKind::Network => &[EntityKind::Network],
            EntityKind::Ipv4Address => &[EntityKind::Ipv4Address],
            EntityKind::Ipv6Address => &[EntityKind::Ipv6Address],
            EntityKind::MacAddress => &[EntityKind::MacAddress],
            EntityKind::Port => &[EntityKind::Port],
            EntityKind::IpAddressRange => &[EntityKind::IpAddressRange],
        }
    }

    /// Members of the asset inventory are listed through it by default.
    pub fn is_inventory_member(self) -> bool {
        matches!(
            self,
            EntityKind::Asset
                | EntityKind::Software
                | EntityKind::OperatingSystem
                | EntityKind::Hardware
                | EntityKind::Network
        )
    }

    /// Fields whose values determine a deterministic identity.
    pub fn identity_material(self) -> &'static [&'static str] {
        match self {
            EntityKind::Software | EntityKind::OperatingSystem => &[
                "name",
                "vendor_name",
                "version",
                "cpe_identifier",
                "software_identifier",
                "patch_level",
            ],
            EntityKind::Hardware => &["name", "vendor_name", "model", "serial_number", "asset_tag"],
            EntityKind::Network => &["name", "network_id", "network_name"],
            _ => &[],
        }
    }

    /// The immutable predicate map for this kind.
    pub fn predicate_map(self) -> &'static PredicateMap {
        // Every kind in ALL is inserted when the registry is built
        &PREDICATE_MAPS[&self]
    }

    fn descriptors(self) -> &'static [crate::orm::PredicateDescriptor] {
        match self {
            EntityKind::Asset => asset::ASSET,
            EntityKind::Software | EntityKind::OperatingSystem => software::SOFTWARE,
            EntityKind::Hardware => hardware::HARDWARE,
            EntityKind::Network => network::NETWORK,
            EntityKind::Ipv4Address | EntityKind::Ipv6Address => address::IP_ADDRESS,
            EntityKind::MacAddress => address::MAC_ADDRESS,
            EntityKind::IpAddressRange => address::IP_ADDRESS_RANGE,
            EntityKind::Port => port::PORT,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_object_type_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_object_type(kind.object_type()), Some(kind));
        }
        assert_eq!(
            EntityKind::from_object_type("computing_device"),
            Some(EntityKind::Hardware)
        );
        assert_eq!(EntityKind::from_object_type("spaceship"), None);
    }

    #[test]
    fn test_asset_type_inference() {
        assert_eq!(
            EntityKind::from_asset_type("operating-system"),
            Some(EntityKind::OperatingSystem)
        );
        assert_eq!(EntityKind::from_asset_type("server"), Some(EntityKind::Hardware));
        assert_eq!(EntityKind::from_asset_type("unknown"), None);
    }

    #[test]
    fn test_iri_namespaces() {
        let iri = EntityKind::Software.iri_for("123").unwrap();
        assert_eq!(iri, "http://scap.nist.gov/ns/asset-identification#Software-123");
        assert!(EntityKind::Software.owns_iri(&iri));
        assert!(!EntityKind::OperatingSystem.owns_iri(&iri));
        assert!(EntityKind::Asset.iri_for("123").is_none());
    }

    #[test]
    fn test_every_kind_has_a_well_formed_map() {
        for kind in EntityKind::ALL {
            let map = kind.predicate_map();
            assert_eq!(map.kind(), kind);

            // Identity fields are always present
            assert!(map.contains("id"), "{} lacks id", kind);
            assert!(map.contains("object_type"), "{} lacks object_type", kind);

            // Exactly one descriptor per field
            let names = map.field_names();
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(unique.len(), names.len(), "{} has duplicate fields", kind);

            // Derived fields only depend on fields of the same map
            for descriptor in map.descriptors() {
                for dependency in descriptor.depends_on {
                    assert!(map.contains(dependency), "{}.{}", kind, dependency);
                }
            }

            // Identity material is made of mapped fields
            for field in kind.identity_material() {
                assert!(map.contains(field), "{} material {}", kind, field);
            }
        }
    }
}
