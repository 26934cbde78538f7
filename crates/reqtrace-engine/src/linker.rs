//! Coverage linking and defect detection.

use std::collections::{HashMap, HashSet};

use reqtrace_core::{ItemId, LinkedSpecificationItem, SpecificationItem, TraceResult};

/// Establish coverage relations between items.
///
/// For every item, each needed artifact type must be provided by at least one
/// item of that type naming this item's exact id in its `covers` list.
/// `covers` references that match no known item are recorded as orphaned.
pub fn link(items: Vec<SpecificationItem>) -> Vec<LinkedSpecificationItem> {
    let known_ids: HashSet<ItemId> = items.iter().map(|i| i.id.clone()).collect();

    // covered id -> artifact types providing coverage
    let mut coverage: HashMap<ItemId, HashSet<String>> = HashMap::new();
    for item in &items {
        for covered in &item.covers {
            coverage
                .entry(covered.clone())
                .or_default()
                .insert(item.id.artifact_type.clone());
        }
    }

    items
        .into_iter()
        .map(|item| {
            let provided = coverage.get(&item.id);
            let uncovered = item
                .needs
                .iter()
                .filter(|needed| !provided.is_some_and(|types| types.contains(*needed)))
                .cloned()
                .collect();
            let orphaned_covers = item
                .covers
                .iter()
                .filter(|covered| !known_ids.contains(covered))
                .cloned()
                .collect();
            LinkedSpecificationItem {
                item,
                uncovered,
                orphaned_covers,
            }
        })
        .collect()
}

/// Compute the coverage trace over linked items.
pub fn trace(linked: Vec<LinkedSpecificationItem>) -> TraceResult {
    TraceResult { linked }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(artifact_type: &str, name: &str, needs: &[&str], covers: &[ItemId]) -> SpecificationItem {
        SpecificationItem {
            id: ItemId::new(artifact_type, name, 1),
            covers: covers.to_vec(),
            needs: needs.iter().map(|n| n.to_string()).collect(),
            tags: Vec::new(),
            origin: None,
            description: None,
        }
    }

    #[test]
    fn test_fully_covered_item_has_no_defect() {
        let dsn = item("dsn", "validator", &["impl"], &[]);
        let imp = item("impl", "validator-impl", &[], &[ItemId::new("dsn", "validator", 1)]);

        let trace = trace(link(vec![dsn, imp]));
        assert_eq!(trace.count(), 2);
        assert_eq!(trace.count_defects(), 0);
    }

    #[test]
    fn test_missing_coverage_is_one_defect() {
        // dsn needs utest and impl; only impl coverage is present.
        let dsn = item("dsn", "validator", &["utest", "impl"], &[]);
        let imp = item("impl", "validator-impl", &[], &[ItemId::new("dsn", "validator", 1)]);

        let trace = trace(link(vec![dsn, imp]));
        assert_eq!(trace.count_defects(), 1);
        let defect = trace.linked.iter().find(|l| l.is_defect()).unwrap();
        assert_eq!(defect.uncovered, vec!["utest".to_string()]);
    }

    #[test]
    fn test_orphaned_cover_is_a_defect() {
        let imp = item("impl", "stray", &[], &[ItemId::new("dsn", "missing", 1)]);

        let trace = trace(link(vec![imp]));
        assert_eq!(trace.count_defects(), 1);
        assert_eq!(
            trace.linked[0].orphaned_covers,
            vec![ItemId::new("dsn", "missing", 1)]
        );
    }

    #[test]
    fn test_revision_mismatch_does_not_cover() {
        let dsn = item("dsn", "validator", &["impl"], &[]);
        let imp = item("impl", "old", &[], &[ItemId::new("dsn", "validator", 2)]);

        let trace = trace(link(vec![dsn, imp]));
        // dsn is uncovered and impl's reference is orphaned.
        assert_eq!(trace.count_defects(), 2);
    }

    #[test]
    fn test_empty_input_traces_clean() {
        let trace = trace(link(Vec::new()));
        assert_eq!(trace.count(), 0);
        assert!(!trace.has_defects());
    }
}
