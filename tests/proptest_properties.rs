//! Property-based tests for request parsing, validation, cache keys and the
//! cache envelope.
//!
//! # Properties Tested
//!
//! 1. **Pagination**: positive integers parse as given, anything else falls
//!    back to page 1 / limit 10, and offsets never overflow
//! 2. **Moyenne range**: an eleve validates iff its moyenne is within 0..=20
//! 3. **Cache keys**: the order of the caller's roles never changes the key
//! 4. **Envelope**: any JSON page survives the cache encoding

use proptest::prelude::*;
use school_api::entity::EleveDraft;
use school_api::envelope::{deserialize_from_cache, serialize_for_cache, CACHE_MAGIC};
use school_api::key::CacheKeyBuilder;
use school_api::repository::Pagination;
use school_api::validation::Validate;

fn eleve(moyenne: f64) -> EleveDraft {
    EleveDraft {
        nom: Some("Martin".to_string()),
        prenom: Some("Léo".to_string()),
        moyenne: Some(moyenne),
        professeur_id: Some(1),
    }
}

// ============================================================================
// Pagination
// ============================================================================

proptest! {
    #[test]
    fn prop_pagination_parses_positive_integers(page in 1u32..100_000, limit in 1u32..1_000) {
        let parsed = Pagination::parse(Some(&page.to_string()), Some(&limit.to_string()));
        prop_assert_eq!(parsed, Pagination::new(page, limit));
        prop_assert_eq!(parsed.offset(), u64::from(page - 1) * u64::from(limit));
    }

    #[test]
    fn prop_pagination_falls_back_on_garbage(page in "[a-z\\-\\.]{0,8}", limit in "[a-z\\-\\.]{0,8}") {
        let parsed = Pagination::parse(Some(&page), Some(&limit));
        prop_assert_eq!(parsed, Pagination::default());
        prop_assert_eq!(parsed.offset(), 0);
    }

    #[test]
    fn prop_pagination_offset_never_overflows(page in any::<u32>(), limit in any::<u32>()) {
        let p = Pagination::new(page, limit);
        prop_assert!(p.page >= 1 && p.limit >= 1);
        prop_assert_eq!(p.offset(), u64::from(p.page - 1) * u64::from(p.limit));
    }
}

// ============================================================================
// Validation
// ============================================================================

proptest! {
    #[test]
    fn prop_moyenne_range(moyenne in -50.0f64..50.0) {
        let violations = eleve(moyenne).validate();
        let in_range = (0.0..=20.0).contains(&moyenne);
        prop_assert_eq!(violations.is_empty(), in_range);
        if !in_range {
            prop_assert_eq!(violations.len(), 1);
            prop_assert_eq!(violations[0].field.as_str(), "moyenne");
        }
    }

    #[test]
    fn prop_long_names_are_rejected(extra in 1usize..64) {
        let mut draft = eleve(10.0);
        draft.nom = Some("a".repeat(255 + extra));
        let violations = draft.validate();
        prop_assert_eq!(violations.len(), 1);
        prop_assert_eq!(violations[0].field.as_str(), "nom");
    }
}

// ============================================================================
// Cache keys and envelope
// ============================================================================

proptest! {
    #[test]
    fn prop_list_key_ignores_role_order(
        roles in prop::collection::vec("ROLE_[A-Z]{1,8}", 1..6).prop_shuffle(),
        page in 1u32..50,
        limit in 1u32..50,
    ) {
        let mut sorted = roles.clone();
        sorted.sort();
        prop_assert_eq!(
            CacheKeyBuilder::list_key("getEleve", page, limit, &roles),
            CacheKeyBuilder::list_key("getEleve", page, limit, &sorted)
        );
    }

    #[test]
    fn prop_envelope_preserves_pages(page in "\\PC*") {
        let bytes = serialize_for_cache(&page).unwrap();
        prop_assert_eq!(&bytes[..4], &CACHE_MAGIC[..]);

        let decoded: String = deserialize_from_cache(&bytes).unwrap();
        prop_assert_eq!(decoded, page);
    }
}
