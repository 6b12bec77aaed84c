//! Software and operating systems share one table.

use crate::orm::PredicateDescriptor as P;

use super::asset::*;

pub(super) static SOFTWARE: &[P] = &[
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
    P::literal(
        "software_identifier",
        "<http://scap.nist.gov/ns/asset-identification#software_identifier>",
    ),
    P::literal(
        "patch_level",
        "<http://scap.nist.gov/ns/asset-identification#patch_level>",
    ),
    P::literal(
        "installation_id",
        "<http://scap.nist.gov/ns/asset-identification#installation_id>",
    ),
    P::literal(
        "license_key",
        "<http://scap.nist.gov/ns/asset-identification#license_key>",
    ),
    DISPLAY_NAME,
    IS_SCANNED,
    LAST_SCANNED,
    RISK_COUNT,
    TOP_RISK_SEVERITY,
];
