use crate::orm::{ChildCollection, PredicateDescriptor as P};

use super::asset::*;

pub(super) static NETWORK: &[P] = &[
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
    P::literal(
        "network_name",
        "<http://scap.nist.gov/ns/asset-identification#network_name>",
    ),
    P::literal(
        "network_id",
        "<http://scap.nist.gov/ns/asset-identification#network_id>",
    ),
    IS_SCANNED,
    LAST_SCANNED,
    // A network owns at most one address range
    P::embedded(
        "network_address_range",
        "<http://scap.nist.gov/ns/asset-identification#network_address_range>",
        ChildCollection::AddressRange,
        "netaddr_range_iri",
    )
    .single(),
    RISK_COUNT,
    TOP_RISK_SEVERITY,
];
