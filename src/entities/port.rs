use crate::orm::PredicateDescriptor as P;

use super::asset::{CREATED, ID, LABELS, MODIFIED, OBJECT_TYPE};

pub(super) static PORT: &[P] = &[
    ID,
    OBJECT_TYPE,
    CREATED,
    MODIFIED,
    LABELS,
    P::integer(
        "port_number",
        "<http://scap.nist.gov/ns/asset-identification#port_number>",
    )
    .required(),
    P::literal(
        "protocols",
        "<http://scap.nist.gov/ns/asset-identification#protocols>",
    )
    .multi(),
];
