//! Namespaces and class IRIs used by the asset inventory graph.

/// Asset identification namespace (classes, asset predicates, entity IRIs)
pub const ASSET_NS: &str = "http://scap.nist.gov/ns/asset-identification#";

/// Common object metadata namespace
pub const COMMON_NS: &str = "http://darklight.ai/ns/common#";

/// OSCAL common namespace (inventory container)
pub const OSCAL_NS: &str = "http://csrc.nist.gov/ns/oscal/common#";

/// OSCAL assessment namespace (risks and observations)
pub const ASSESSMENT_NS: &str = "http://csrc.nist.gov/ns/oscal/assessment/common#";

// Classes
pub const CLASS_OBJECT: &str = "http://darklight.ai/ns/common#Object";
pub const CLASS_ASSET: &str = "http://scap.nist.gov/ns/asset-identification#Asset";
pub const CLASS_IT_ASSET: &str = "http://scap.nist.gov/ns/asset-identification#ItAsset";
pub const CLASS_SOFTWARE: &str = "http://scap.nist.gov/ns/asset-identification#Software";
pub const CLASS_OPERATING_SYSTEM: &str =
    "http://scap.nist.gov/ns/asset-identification#OperatingSystem";
pub const CLASS_HARDWARE: &str = "http://scap.nist.gov/ns/asset-identification#Hardware";
pub const CLASS_COMPUTING_DEVICE: &str =
    "http://scap.nist.gov/ns/asset-identification#ComputingDevice";
pub const CLASS_NETWORK: &str = "http://scap.nist.gov/ns/asset-identification#Network";
pub const CLASS_IP_ADDRESS: &str = "http://scap.nist.gov/ns/asset-identification#IpAddress";
pub const CLASS_IPV4_ADDRESS: &str = "http://scap.nist.gov/ns/asset-identification#IpV4Address";
pub const CLASS_IPV6_ADDRESS: &str = "http://scap.nist.gov/ns/asset-identification#IpV6Address";
pub const CLASS_MAC_ADDRESS: &str = "http://scap.nist.gov/ns/asset-identification#MACAddress";
pub const CLASS_PORT: &str = "http://scap.nist.gov/ns/asset-identification#Port";
pub const CLASS_IP_ADDRESS_RANGE: &str =
    "http://scap.nist.gov/ns/asset-identification#IpAddressRange";
pub const CLASS_ASSET_INVENTORY: &str = "http://csrc.nist.gov/ns/oscal/common#AssetInventory";
pub const CLASS_RISK: &str = "http://csrc.nist.gov/ns/oscal/assessment/common#Risk";

// Predicates used outside the per-kind tables
pub const PRED_ID: &str = "<http://darklight.ai/ns/common#id>";
pub const PRED_OBJECT_TYPE: &str = "<http://darklight.ai/ns/common#object_type>";
pub const PRED_CREATED: &str = "<http://darklight.ai/ns/common#created>";
pub const PRED_MODIFIED: &str = "<http://darklight.ai/ns/common#modified>";
pub const PRED_INVENTORY_ASSETS: &str = "<http://csrc.nist.gov/ns/oscal/common#assets>";
pub const PRED_RISK_LEVEL: &str = "<http://csrc.nist.gov/ns/oscal/assessment/common#risk_level>";
pub const PRED_RISK_STATUS: &str = "<http://csrc.nist.gov/ns/oscal/assessment/common#risk_status>";

/// Path from a risk to the assets it concerns (risk → observation → subject → asset)
pub const PATH_RISK_SUBJECT: &str = "<http://csrc.nist.gov/ns/oscal/assessment/common#related_observations>/<http://csrc.nist.gov/ns/oscal/assessment/common#subjects>/<http://csrc.nist.gov/ns/oscal/assessment/common#subject_ref>";

/// Inverse of [PATH_RISK_SUBJECT]: from an asset to the risks that concern it
pub const PATH_ASSET_RISKS: &str = "^<http://csrc.nist.gov/ns/oscal/assessment/common#subject_ref>/^<http://csrc.nist.gov/ns/oscal/assessment/common#subjects>/^<http://csrc.nist.gov/ns/oscal/assessment/common#related_observations>";

/// Statuses of risks that no longer count toward an asset's risk summary
pub const INACTIVE_RISK_STATUSES: &[&str] = &["closed", "deviation_approved"];
