use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::model::{walk_forest, TreeNode};
use crate::record::{Activity, Report};

pub fn fuzzy_score(needle: &str, hay: &str) -> Option<i64> {
    let m = SkimMatcherV2::default();
    m.fuzzy_match(hay, needle)
}

/// `needle_lower` must already be lowercase.
pub fn contains_ci(hay: &str, needle_lower: &str) -> bool {
    hay.to_lowercase().contains(needle_lower)
}

/// Reports whose name, description or type contain `text`.
pub fn search_reports<'a>(reports: &'a [Report], text: &str) -> Vec<&'a Report> {
    let needle = text.to_lowercase();
    reports
        .iter()
        .filter(|r| {
            contains_ci(&r.name, &needle)
                || contains_ci(&r.description, &needle)
                || contains_ci(&r.kind, &needle)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub text: String,
    pub status: Option<String>,
    pub kind: Option<String>,
}

pub fn search_activities<'a>(activities: &'a [Activity], filter: &ActivityFilter) -> Vec<&'a Activity> {
    let needle = filter.text.to_lowercase();
    let status = filter.status.as_deref().filter(|s| !s.is_empty());
    let kind = filter.kind.as_deref().filter(|s| !s.is_empty());
    activities
        .iter()
        .filter(|a| {
            needle.is_empty()
                || contains_ci(&a.resource, &needle)
                || contains_ci(&a.user, &needle)
                || contains_ci(&a.kind, &needle)
        })
        .filter(|a| status.map_or(true, |s| a.status == s))
        .filter(|a| kind.map_or(true, |k| a.kind == k))
        .collect()
}

/// Nodes whose name fuzzy-matches `needle`, best match first.
pub fn find_nodes<'a>(roots: &'a [TreeNode], needle: &str) -> Vec<&'a TreeNode> {
    let mut hits: Vec<(i64, &TreeNode)> = Vec::new();
    walk_forest(roots, &mut |node, _| {
        if let Some(score) = fuzzy_score(needle, &node.name) {
            hits.push((score, node));
        }
    });
    // stable: equal scores keep walk order
    hits.sort_by(|a, b| b.0.cmp(&a.0));
    hits.into_iter().map(|(_, n)| n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlatEntry;
    use crate::tree::build_tree;

    fn report(name: &str, kind: &str, description: &str) -> Report {
        Report {
            id: String::new(),
            name: name.into(),
            kind: kind.into(),
            status: "completed".into(),
            created_at: String::new(),
            size: String::new(),
            description: description.into(),
        }
    }

    fn activity(kind: &str, user: &str, resource: &str, status: &str) -> Activity {
        Activity {
            id: String::new(),
            kind: kind.into(),
            user: user.into(),
            resource: resource.into(),
            timestamp: String::new(),
            status: status.into(),
        }
    }

    #[test]
    fn reports_match_any_field() {
        let reports = vec![
            report("Data Drift Report", "data_drift", "drift analysis"),
            report("Bias Audit", "bias", "Fairness checks"),
        ];
        assert_eq!(search_reports(&reports, "DRIFT").len(), 1);
        assert_eq!(search_reports(&reports, "fairness")[0].name, "Bias Audit");
        assert_eq!(search_reports(&reports, "").len(), 2);
    }

    #[test]
    fn activities_filter_in_sequence() {
        let feed = vec![
            activity("model_upload", "Jane Smith", "Sentiment Model", "completed"),
            activity("dataset_upload", "Jane Smith", "Customer Data", "failed"),
            activity("model_upload", "John Doe", "Fraud Model", "failed"),
        ];
        let f = ActivityFilter {
            text: "jane".into(),
            ..Default::default()
        };
        assert_eq!(search_activities(&feed, &f).len(), 2);

        let f = ActivityFilter {
            text: "model".into(),
            status: Some("failed".into()),
            kind: None,
        };
        let hits = search_activities(&feed, &f);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user, "John Doe");

        let f = ActivityFilter {
            kind: Some("dataset_upload".into()),
            ..Default::default()
        };
        assert_eq!(search_activities(&feed, &f)[0].resource, "Customer Data");
    }

    #[test]
    fn fuzzy_lookup_over_tree() {
        let roots = build_tree(
            &[
                FlatEntry::file("iris_model/MLmodel", 927),
                FlatEntry::file("iris_model/conda.yaml", 262),
                FlatEntry::file("logs/train.log", 10),
            ],
            "",
        );
        let hits = find_nodes(&roots, "conda");
        assert_eq!(hits[0].full_path, "/iris_model/conda.yaml");
        assert!(find_nodes(&roots, "zzzz").is_empty());
    }
}
