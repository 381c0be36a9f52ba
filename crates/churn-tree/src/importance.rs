//! Feature importance ranking.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Pair importances with their feature names and rank them.
///
/// Sorts descending by importance (stable, so equal scores keep schema
/// order) and assigns 1-based ranks. Extra importances beyond `names`
/// are ignored.
#[must_use]
pub fn rank_importances(importances: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::rank_importances;

    #[test]
    fn ranks_descending() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_importances(&[0.2, 0.7, 0.1], &names);
        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let names = vec!["x".to_string(), "y".to_string()];
        let ranked = rank_importances(&[0.0, 0.0], &names);
        assert_eq!(ranked[0].name, "x");
    }
}
