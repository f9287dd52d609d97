//! Resolution of a law to the ordinances that derive authority from it.

use std::collections::{BTreeMap, BTreeSet};

use lawmatch_core::{OrdinanceId, ParentLaw};
use lawmatch_store::{DuckStore, Session, StoreError};

use crate::ImpactError;

/// Anything that can list parent-law links as currently persisted.
pub trait LinkSource {
    fn links_for_law(&self, law_id: &str) -> Result<Vec<ParentLaw>, StoreError>;
    fn all_links(&self) -> Result<Vec<ParentLaw>, StoreError>;
}

impl LinkSource for Session<'_> {
    fn links_for_law(&self, law_id: &str) -> Result<Vec<ParentLaw>, StoreError> {
        self.parent_laws_for_law(law_id)
    }

    fn all_links(&self) -> Result<Vec<ParentLaw>, StoreError> {
        self.all_parent_laws()
    }
}

impl LinkSource for DuckStore {
    fn links_for_law(&self, law_id: &str) -> Result<Vec<ParentLaw>, StoreError> {
        self.parent_laws_for_law(law_id)
    }

    fn all_links(&self) -> Result<Vec<ParentLaw>, StoreError> {
        self.session(|s| s.all_parent_laws())
    }
}

/// Read-through index over parent-law links, keyed by `law_id`.
///
/// Nothing is cached: every call reflects the source at call time, so inside
/// an analysis transaction it sees that transaction's writes. A law nobody
/// references resolves to the empty set; only a failed lookup is an error.
pub struct ParentLawIndex<'a, S: LinkSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: LinkSource + ?Sized> ParentLawIndex<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn resolve(&self, law_id: &str) -> Result<BTreeSet<OrdinanceId>, ImpactError> {
        Ok(self.resolve_links(law_id)?.into_keys().collect())
    }

    /// The link for each referencing ordinance. Links are unique per
    /// (ordinance, law), so each ordinance appears once.
    pub fn resolve_links(
        &self,
        law_id: &str,
    ) -> Result<BTreeMap<OrdinanceId, ParentLaw>, ImpactError> {
        let law_id = law_id.trim();
        if law_id.is_empty() {
            return Ok(BTreeMap::new());
        }
        let links = self
            .source
            .links_for_law(law_id)
            .map_err(ImpactError::from_index)?;
        Ok(links.into_iter().map(|l| (l.ordinance_id, l)).collect())
    }

    /// Every law with the ordinances that reference it.
    pub fn grouped(&self) -> Result<BTreeMap<String, BTreeSet<OrdinanceId>>, ImpactError> {
        let mut groups: BTreeMap<String, BTreeSet<OrdinanceId>> = BTreeMap::new();
        for link in self.source.all_links().map_err(ImpactError::from_index)? {
            groups.entry(link.law_id).or_default().insert(link.ordinance_id);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawmatch_core::{Category, LawLink, LawType, OrdinanceFact};

    fn store_with_links(links: &[(&str, &str)]) -> DuckStore {
        let store = DuckStore::open().unwrap();
        for (code, law_id) in links {
            let id = match store.find_ordinance_by_code(code).unwrap() {
                Some(o) => o.id,
                None => store
                    .upsert_ordinance(&OrdinanceFact {
                        code: code.to_string(),
                        name: format!("{code} 조례"),
                        category: Some(Category::Ordinance),
                        department: None,
                        status: None,
                        enacted_date: None,
                        enforced_date: None,
                    })
                    .unwrap()
                    .id(),
            };
            store
                .upsert_parent_law(
                    id,
                    &LawLink {
                        law_id: law_id.to_string(),
                        law_name: format!("법 {law_id}"),
                        law_type: LawType::EnforcementDecree,
                        related_articles: None,
                        proclaimed_date: None,
                        enforced_date: None,
                    },
                )
                .unwrap();
        }
        store
    }

    struct Unreachable;

    impl LinkSource for Unreachable {
        fn links_for_law(&self, _: &str) -> Result<Vec<ParentLaw>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn all_links(&self) -> Result<Vec<ParentLaw>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn resolves_every_referencing_ordinance() {
        let store = store_with_links(&[("A", "L1"), ("B", "L1"), ("C", "L2")]);
        let index = ParentLawIndex::new(&store);
        assert_eq!(index.resolve("L1").unwrap().len(), 2);
        assert_eq!(index.resolve(" L2 ").unwrap().len(), 1);
    }

    #[test]
    fn unreferenced_law_is_empty_not_error() {
        let store = store_with_links(&[("A", "L1")]);
        let index = ParentLawIndex::new(&store);
        assert!(index.resolve("L9").unwrap().is_empty());
        assert!(index.resolve("").unwrap().is_empty());
    }

    #[test]
    fn lookup_failure_is_index_unavailable() {
        let index = ParentLawIndex::new(&Unreachable);
        let err = index.resolve("L1").unwrap_err();
        assert!(matches!(err, ImpactError::IndexUnavailable(_)));
        assert!(err.is_retryable());
        assert!(index.grouped().is_err());
    }

    #[test]
    fn grouped_by_law() {
        let store = store_with_links(&[("A", "L1"), ("B", "L1"), ("A", "L2")]);
        let groups = ParentLawIndex::new(&store).grouped().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["L1"].len(), 2);
        assert_eq!(groups["L2"].len(), 1);
    }

    #[test]
    fn sees_writes_inside_a_session() {
        let store = store_with_links(&[("A", "L1")]);
        let resolved = store
            .session(|s| ParentLawIndex::new(s).resolve("L1"))
            .unwrap();
        assert_eq!(resolved.len(), 1);
    }
}
