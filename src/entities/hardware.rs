use crate::orm::{ChildCollection, PredicateDescriptor as P};

use super::EntityKind;
use super::asset::*;

pub(super) static HARDWARE: &[P] = &[
    ID,
    OBJECT_TYPE,
    CREATED,
    MODIFIED,
    LABELS,
    EXTERNAL_REFERENCES,
    NOTES,
    NAME,
    DESCRIPTION,
    ASSET_ID,
    ASSET_TAG,
    ASSET_TYPE,
    SERIAL_NUMBER,
    VENDOR_NAME,
    VERSION,
    RELEASE_DATE,
    IMPLEMENTATION_POINT,
    OPERATIONAL_STATUS,
    LOCATIONS,
    RESPONSIBLE_PARTIES,
    FUNCTION,
    CPE_IDENTIFIER,
    P::literal("model", "<http://scap.nist.gov/ns/asset-identification#model>"),
    P::literal(
        "motherboard_id",
        "<http://scap.nist.gov/ns/asset-identification#motherboard_id>",
    ),
    P::literal(
        "baseline_configuration_name",
        "<http://scap.nist.gov/ns/asset-identification#baseline_configuration_name>",
    ),
    P::literal("bios_id", "<http://scap.nist.gov/ns/asset-identification#bios_id>"),
    P::literal("fqdn", "<http://scap.nist.gov/ns/asset-identification#fqdn>"),
    P::literal("hostname", "<http://scap.nist.gov/ns/asset-identification#hostname>"),
    P::literal(
        "netbios_name",
        "<http://scap.nist.gov/ns/asset-identification#netbios_name>",
    ),
    P::literal(
        "network_id",
        "<http://scap.nist.gov/ns/asset-identification#network_id>",
    ),
    P::literal(
        "default_gateway",
        "<http://scap.nist.gov/ns/asset-identification#default_gateway>",
    ),
    P::literal("vlan_id", "<http://scap.nist.gov/ns/asset-identification#vlan_id>"),
    P::literal("uri", "<http://scap.nist.gov/ns/asset-identification#uri>"),
    P::boolean(
        "is_publicly_accessible",
        "<http://scap.nist.gov/ns/asset-identification#is_publicly_accessible>",
    ),
    IS_SCANNED,
    P::boolean(
        "is_virtual",
        "<http://scap.nist.gov/ns/asset-identification#is_virtual>",
    ),
    LAST_SCANNED,
    P::reference(
        "installed_hardware",
        "<http://scap.nist.gov/ns/asset-identification#installed_hardware>",
        EntityKind::Hardware,
        "installed_hw_iri",
    )
    .multi(),
    P::reference(
        "installed_operating_system",
        "<http://scap.nist.gov/ns/asset-identification#installed_operating_system>",
        EntityKind::OperatingSystem,
        "installed_os_iri",
    ),
    P::reference(
        "installed_software",
        "<http://scap.nist.gov/ns/asset-identification#installed_software>",
        EntityKind::Software,
        "installed_sw_iri",
    )
    .multi(),
    P::reference(
        "connected_to_network",
        "<http://scap.nist.gov/ns/asset-identification#connected_to_network>",
        EntityKind::Network,
        "conn_network_iri",
    ),
    P::embedded(
        "ip_address",
        "<http://scap.nist.gov/ns/asset-identification#ip_address>",
        ChildCollection::IpAddress,
        "ip_addr_iri",
    ),
    P::embedded(
        "mac_address",
        "<http://scap.nist.gov/ns/asset-identification#mac_address>",
        ChildCollection::MacAddress,
        "mac_addr_iri",
    ),
    P::embedded(
        "ports",
        "<http://scap.nist.gov/ns/asset-identification#ports>",
        ChildCollection::Port,
        "ports_iri",
    ),
    RISK_COUNT,
    TOP_RISK_SEVERITY,
];
