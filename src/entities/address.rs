//! Address children owned by hardware and networks.

use crate::orm::PredicateDescriptor as P;

use super::asset::{CREATED, ID, LABELS, MODIFIED, OBJECT_TYPE};

pub(super) static IP_ADDRESS: &[P] = &[
    ID,
    OBJECT_TYPE,
    CREATED,
    MODIFIED,
    LABELS,
    P::literal(
        "ip_address_value",
        "<http://scap.nist.gov/ns/asset-identification#ip_address_value>",
    )
    .required(),
];

pub(super) static MAC_ADDRESS: &[P] = &[
    ID,
    OBJECT_TYPE,
    CREATED,
    MODIFIED,
    LABELS,
    P::literal(
        "mac_address_value",
        "<http://scap.nist.gov/ns/asset-identification#mac_address_value>",
    )
    .required(),
    P::boolean(
        "is_virtual",
        "<http://scap.nist.gov/ns/asset-identification#is_virtual>",
    ),
];

pub(super) static IP_ADDRESS_RANGE: &[P] = &[
    ID,
    OBJECT_TYPE,
    CREATED,
    MODIFIED,
    LABELS,
    P::literal(
        "starting_ip_address",
        "<http://scap.nist.gov/ns/asset-identification#starting_ip_address>",
    )
    .required(),
    P::literal(
        "ending_ip_address",
        "<http://scap.nist.gov/ns/asset-identification#ending_ip_address>",
    )
    .required(),
];
