use std::collections::HashMap;

use bibres_core::{CitationRecord, IdentifierKind};

use crate::identifiers;

/// References that resolved to the same work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// ref_id of the lowest-position member.
    pub canonical: String,
    /// ref_ids of the other members, in input order.
    pub duplicates: Vec<String>,
}

/// Groups records that share a DOI or a PMID, transitively.
///
/// Grouping is informational: records are never merged or dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateFinder;

impl DuplicateFinder {
    pub fn new() -> Self {
        Self
    }

    /// `records` must be in input order.
    pub fn find_groups(&self, records: &[CitationRecord]) -> Vec<DuplicateGroup> {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            for kind in [IdentifierKind::Doi, IdentifierKind::Pmid] {
                if let Some(key) = dedup_key(record, kind) {
                    buckets.entry(key).or_default().push(idx);
                }
            }
        }

        let mut dsu = DisjointSet::new(records.len());
        for indexes in buckets.into_values() {
            if let Some((first, rest)) = indexes.split_first() {
                for idx in rest {
                    dsu.union(*first, *idx);
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..records.len() {
            let root = dsu.find(idx);
            components.entry(root).or_default().push(idx);
        }

        let mut groups: Vec<(usize, DuplicateGroup)> = components
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|mut members| {
                members.sort_unstable();
                let primary = members[0];
                let group = DuplicateGroup {
                    canonical: records[primary].id.clone(),
                    duplicates: members[1..]
                        .iter()
                        .map(|idx| records[*idx].id.clone())
                        .collect(),
                };
                (primary, group)
            })
            .collect();

        groups.sort_by_key(|(primary, _)| *primary);
        groups.into_iter().map(|(_, group)| group).collect()
    }
}

fn dedup_key(record: &CitationRecord, kind: IdentifierKind) -> Option<String> {
    let value = record.identifier(kind)?;
    let normalized =
        identifiers::normalize(kind, value).unwrap_or_else(|| value.trim().to_lowercase());
    Some(format!("{kind}:{normalized}"))
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, left: usize, right: usize) {
        let left_root = self.find(left);
        let right_root = self.find(right);

        if left_root == right_root {
            return;
        }

        match self.rank[left_root].cmp(&self.rank[right_root]) {
            std::cmp::Ordering::Less => self.parent[left_root] = right_root,
            std::cmp::Ordering::Greater => self.parent[right_root] = left_root,
            std::cmp::Ordering::Equal => {
                self.parent[right_root] = left_root;
                self.rank[left_root] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, doi: Option<&str>, pmid: Option<&str>) -> CitationRecord {
        let mut record = CitationRecord::bare(id.to_string(), format!("https://x/{id}"));
        record.doi = doi.map(ToOwned::to_owned);
        record.pmid = pmid.map(ToOwned::to_owned);
        record
    }

    #[test]
    fn groups_by_shared_doi_case_insensitively() {
        let records = vec![
            record(1, Some("10.1/ABC"), None),
            record(2, None, None),
            record(3, Some("10.1/abc"), None),
        ];
        let groups = DuplicateFinder::new().find_groups(&records);
        assert_eq!(
            groups,
            vec![DuplicateGroup {
                canonical: "1".to_string(),
                duplicates: vec!["3".to_string()],
            }]
        );
    }

    #[test]
    fn groups_transitively_across_kinds() {
        let records = vec![
            record(1, Some("10.1/a"), None),
            record(2, Some("10.1/a"), Some("55")),
            record(3, None, Some("55")),
            record(4, Some("10.1/b"), None),
        ];
        let groups = DuplicateFinder::new().find_groups(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical, "1");
        assert_eq!(groups[0].duplicates, vec!["2", "3"]);
    }

    #[test]
    fn pmcid_alone_does_not_group() {
        let mut a = record(1, None, None);
        a.pmcid = Some("PMC1".to_string());
        let mut b = record(2, None, None);
        b.pmcid = Some("PMC1".to_string());
        assert!(DuplicateFinder::new().find_groups(&[a, b]).is_empty());
    }

    #[test]
    fn groups_are_ordered_by_primary_position() {
        let records = vec![
            record(1, None, Some("9")),
            record(2, Some("10.1/z"), None),
            record(3, None, Some("9")),
            record(4, Some("10.1/z"), None),
        ];
        let groups = DuplicateFinder::new().find_groups(&records);
        let canonicals: Vec<&str> = groups.iter().map(|g| g.canonical.as_str()).collect();
        assert_eq!(canonicals, vec!["1", "2"]);
    }
}
