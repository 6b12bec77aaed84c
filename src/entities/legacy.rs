//! Last-resort kind inference for rows written by older producers.
//!
//! Rows normally carry an `object_type`. Some historic data only has an IRI,
//! so the namespace segment is matched as a substring. The longest matching
//! segment wins; two equally long matches are ambiguous and yield nothing.

use super::EntityKind;

/// Infer a kind from the namespace segment embedded in an IRI.
pub fn infer_kind_from_iri(iri: &str) -> Option<EntityKind> {
    let mut best: Option<(EntityKind, usize)> = None;
    let mut tied = false;

    for kind in EntityKind::ALL {
        let Some(segment) = kind.namespace_segment() else {
            continue;
        };
        if !iri.contains(segment) {
            continue;
        }
        match best {
            Some((_, len)) if segment.len() < len => {}
            Some((_, len)) if segment.len() == len => tied = true,
            _ => {
                best = Some((kind, segment.len()));
                tied = false;
            }
        }
    }

    if tied { None } else { best.map(|(kind, _)| kind) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_inference() {
        assert_eq!(
            infer_kind_from_iri("http://scap.nist.gov/ns/asset-identification#Hardware-1"),
            Some(EntityKind::Hardware)
        );
        assert_eq!(
            infer_kind_from_iri("http://example.com/legacy/OperatingSystem-7"),
            Some(EntityKind::OperatingSystem)
        );
        assert_eq!(infer_kind_from_iri("http://example.com/thing/42"), None);
    }
}
