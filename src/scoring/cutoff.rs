//! Read-time cutoff over the composite signal

use crate::model::Dependency;

/// Dependencies that qualify for scraping, in the order given
pub fn select_qualifying(deps: Vec<Dependency>, cutoff: f64) -> Vec<Dependency> {
    deps.into_iter().filter(|d| d.qualifies(cutoff)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DependencyScores;

    fn dep(id: i64, url: Option<&str>, scores: Option<(f64, f64)>) -> Dependency {
        Dependency {
            id,
            project_id: "p".to_string(),
            package_name: format!("pkg{}", id),
            version_spec: "*".to_string(),
            repository_url: url.map(str::to_string),
            scores: scores.map(|(r, n)| DependencyScores::new(r, n)),
        }
    }

    #[test]
    fn test_boundary_is_inclusive_and_order_kept() {
        let deps = vec![
            dep(1, Some("https://h/o/a"), Some((0.7, 0.5))),
            dep(2, Some("https://h/o/b"), Some((0.3, 0.3))),
            dep(3, None, Some((1.0, 1.0))),
            dep(4, Some("https://h/o/d"), None),
            dep(5, Some("https://h/o/e"), Some((1.0, 1.0))),
        ];
        let ids: Vec<_> = select_qualifying(deps, 0.35).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }
}
