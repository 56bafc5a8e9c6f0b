//! Human-readable, event-namespaced identity identifiers.
//!
//! Identifiers follow the `person_<N>` convention, optionally prefixed by
//! the namespace (`{event}_person_<N>`). Allocation scans the existing ids
//! for the highest numeric suffix and returns max+1, so externally deleted
//! or merged identities never cause id reuse.

const ID_STEM: &str = "person_";

/// Modulus for hash-derived fallback identifiers. Small on purpose — this
/// mirrors the observed legacy behavior, collisions included.
const FALLBACK_MODULUS: u64 = 1000;

/// Allocate the next identity id in `namespace` given every id currently
/// stored there. Ids that do not follow the `person_<N>` convention are
/// ignored.
pub fn next_identity_id<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    namespace: Option<&str>,
) -> String {
    let max = existing
        .into_iter()
        .filter_map(|id| numeric_suffix(id, namespace))
        .max();
    qualified(namespace, max.map_or(1, |n| n + 1))
}

/// Deterministic pseudo-identity for an embedding the matcher could not
/// process: FNV-1a over the raw value bytes, reduced modulo a small
/// constant. Unrelated faces can alias onto the same identifier; the
/// pipeline logs every use of this path.
pub fn fallback_identity_id(values: &[f32], namespace: Option<&str>) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for value in values {
        for byte in value.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    qualified(namespace, hash % FALLBACK_MODULUS)
}

/// Render `person_<n>`, namespace-prefixed when one is present.
pub fn qualified(namespace: Option<&str>, n: u64) -> String {
    match namespace {
        Some(ns) => format!("{ns}_{ID_STEM}{n}"),
        None => format!("{ID_STEM}{n}"),
    }
}

/// Extract the numeric suffix of a conventional identity id. Accepts both
/// the bare `person_<N>` form and the `{namespace}_person_<N>` form when a
/// namespace is in effect.
fn numeric_suffix(id: &str, namespace: Option<&str>) -> Option<u64> {
    let rest = match namespace {
        Some(ns) => id
            .strip_prefix(ns)
            .and_then(|r| r.strip_prefix('_'))
            .unwrap_or(id),
        None => id,
    };
    rest.strip_prefix(ID_STEM)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_allocation() {
        assert_eq!(next_identity_id([], None), "person_1");
        assert_eq!(next_identity_id([], Some("gala")), "gala_person_1");
    }

    #[test]
    fn test_sequential_allocation() {
        let existing = ["person_1", "person_2"];
        assert_eq!(next_identity_id(existing, None), "person_3");
    }

    #[test]
    fn test_gap_tolerance() {
        // person_2 was deleted externally; its number must not be reused
        let existing = ["person_1", "person_3"];
        assert_eq!(next_identity_id(existing, None), "person_4");
    }

    #[test]
    fn test_namespaced_allocation() {
        let existing = ["wedding_person_1", "wedding_person_2"];
        assert_eq!(
            next_identity_id(existing, Some("wedding")),
            "wedding_person_3"
        );
    }

    #[test]
    fn test_mixed_prefixed_and_bare() {
        let existing = ["wedding_person_5", "person_2"];
        assert_eq!(
            next_identity_id(existing, Some("wedding")),
            "wedding_person_6"
        );
    }

    #[test]
    fn test_unconventional_ids_ignored() {
        let existing = ["unknown", "person_x", "alice"];
        assert_eq!(next_identity_id(existing, None), "person_1");
    }

    #[test]
    fn test_fallback_deterministic() {
        let values = vec![0.5f32; 128];
        let a = fallback_identity_id(&values, None);
        let b = fallback_identity_id(&values, None);
        assert_eq!(a, b);
        assert!(a.starts_with("person_"));
        let n: u64 = a.strip_prefix("person_").unwrap().parse().unwrap();
        assert!(n < 1000);
    }

    #[test]
    fn test_fallback_namespaced() {
        let values = vec![-1.25f32; 128];
        let id = fallback_identity_id(&values, Some("gala"));
        assert!(id.starts_with("gala_person_"));
    }

    #[test]
    fn test_fallback_spreads_over_buckets() {
        // The modulus is small, so individual collisions are possible, but
        // a batch of distinct inputs must not all land in one bucket.
        let ids: std::collections::HashSet<String> = (0..50)
            .map(|i| fallback_identity_id(&[i as f32, (i * i) as f32], None))
            .collect();
        assert!(ids.len() > 1);
    }
}
