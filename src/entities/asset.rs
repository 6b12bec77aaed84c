//! Fields shared by every inventory asset, and the table of the abstract
//! `Asset` kind used for mixed listings.

use crate::orm::{Derivation, PredicateDescriptor as P, ValueKind};

use super::vocab::{PATH_ASSET_RISKS, PRED_CREATED, PRED_ID, PRED_MODIFIED, PRED_OBJECT_TYPE};

// Object metadata
pub(super) const ID: P = P::literal("id", PRED_ID).read_only();
pub(super) const OBJECT_TYPE: P = P::literal("object_type", PRED_OBJECT_TYPE).read_only();
pub(super) const CREATED: P = P::datetime("created", PRED_CREATED).read_only();
pub(super) const MODIFIED: P = P::datetime("modified", PRED_MODIFIED).read_only();
pub(super) const LABELS: P = P::iri_list(
    "labels",
    "<http://darklight.ai/ns/common#labels>",
    "labels_iri",
);
pub(super) const EXTERNAL_REFERENCES: P = P::iri_list(
    "external_references",
    "<http://darklight.ai/ns/common#external_references>",
    "ext_ref_iri",
);
pub(super) const NOTES: P = P::iri_list(
    "notes",
    "<http://darklight.ai/ns/common#notes>",
    "notes_iri",
);

// Asset
pub(super) const NAME: P =
    P::literal("name", "<http://scap.nist.gov/ns/asset-identification#name>").required();
pub(super) const DESCRIPTION: P = P::literal(
    "description",
    "<http://scap.nist.gov/ns/asset-identification#description>",
);
pub(super) const ASSET_ID: P = P::literal(
    "asset_id",
    "<http://scap.nist.gov/ns/asset-identification#asset_id>",
);
pub(super) const ASSET_TAG: P = P::literal(
    "asset_tag",
    "<http://scap.nist.gov/ns/asset-identification#asset_tag>",
);
pub(super) const ASSET_TYPE: P = P::literal(
    "asset_type",
    "<http://scap.nist.gov/ns/asset-identification#asset_type>",
);
pub(super) const SERIAL_NUMBER: P = P::literal(
    "serial_number",
    "<http://scap.nist.gov/ns/asset-identification#serial_number>",
);
pub(super) const VENDOR_NAME: P = P::literal(
    "vendor_name",
    "<http://scap.nist.gov/ns/asset-identification#vendor_name>",
);
pub(super) const VERSION: P = P::literal(
    "version",
    "<http://scap.nist.gov/ns/asset-identification#version>",
);
pub(super) const RELEASE_DATE: P = P::datetime(
    "release_date",
    "<http://scap.nist.gov/ns/asset-identification#release_date>",
);
pub(super) const IMPLEMENTATION_POINT: P = P::literal(
    "implementation_point",
    "<http://scap.nist.gov/ns/asset-identification#implementation_point>",
);
pub(super) const OPERATIONAL_STATUS: P = P::literal(
    "operational_status",
    "<http://scap.nist.gov/ns/asset-identification#operational_status>",
);
pub(super) const LOCATIONS: P = P::iri_list(
    "locations",
    "<http://scap.nist.gov/ns/asset-identification#locations>",
    "locations_iri",
);
pub(super) const RESPONSIBLE_PARTIES: P = P::iri_list(
    "responsible_parties",
    "<http://scap.nist.gov/ns/asset-identification#responsible_parties>",
    "resp_parties_iri",
);

// IT asset
pub(super) const FUNCTION: P = P::literal(
    "function",
    "<http://scap.nist.gov/ns/asset-identification#function>",
);
pub(super) const CPE_IDENTIFIER: P = P::literal(
    "cpe_identifier",
    "<http://scap.nist.gov/ns/asset-identification#cpe_identifier>",
);
pub(super) const IS_SCANNED: P = P::boolean(
    "is_scanned",
    "<http://scap.nist.gov/ns/asset-identification#is_scanned>",
);
pub(super) const LAST_SCANNED: P = P::datetime(
    "last_scanned",
    "<http://scap.nist.gov/ns/asset-identification#last_scanned>",
);

// Risk summary, joined in a second pass
pub(super) const RISK_COUNT: P = P::expensive("risk_count", PATH_ASSET_RISKS, ValueKind::Integer);
pub(super) const TOP_RISK_SEVERITY: P =
    P::expensive("top_risk_severity", PATH_ASSET_RISKS, ValueKind::Severity);

/// Stored display name; computed from name, vendor and version when absent.
pub(super) const DISPLAY_NAME: P = P::literal(
    "display_name",
    "<http://scap.nist.gov/ns/asset-identification#display_name>",
)
.derived(Derivation::DisplayName, &["name", "vendor_name", "version"]);

pub(super) static ASSET: &[P] = &[
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
    RISK_COUNT,
    TOP_RISK_SEVERITY,
];
