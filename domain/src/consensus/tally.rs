//! Weighted vote tally.

use super::vote::Vote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sum of vote weights per offered option.
///
/// Options nobody voted for are present with a tally of zero. Votes for
/// options that were not offered are set aside in `discarded`. `counts`
/// holds the number of accepted votes per option.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub totals: BTreeMap<String, f64>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
    pub discarded: Vec<Vote>,
}

impl Tally {
    /// Count `votes` over `options`. Returns the tally and the accepted votes.
    pub fn count(options: &[String], votes: Vec<Vote>) -> (Tally, Vec<Vote>) {
        let mut totals: BTreeMap<String, f64> =
            options.iter().map(|o| (o.clone(), 0.0)).collect();
        let mut counts: BTreeMap<String, usize> = options.iter().map(|o| (o.clone(), 0)).collect();
        let mut accepted = Vec::with_capacity(votes.len());
        let mut discarded = Vec::new();

        for vote in votes {
            match totals.get_mut(&vote.option) {
                Some(total) => {
                    *total += vote.weight;
                    *counts.entry(vote.option.clone()).or_default() += 1;
                    accepted.push(vote);
                }
                None => discarded.push(vote),
            }
        }

        (
            Tally {
                totals,
                counts,
                discarded,
            },
            accepted,
        )
    }

    pub fn get(&self, option: &str) -> f64 {
        self.totals.get(option).copied().unwrap_or(0.0)
    }

    pub fn votes_for(&self, option: &str) -> usize {
        self.counts.get(option).copied().unwrap_or(0)
    }

    /// Highest tally among options that received at least one vote.
    pub fn max(&self) -> Option<f64> {
        self.totals
            .iter()
            .filter(|(option, _)| self.votes_for(option) > 0)
            .map(|(_, total)| *total)
            .reduce(f64::max)
    }

    /// Voted options whose tally is within `epsilon` of the maximum, in the
    /// order they were offered.
    pub fn leaders<'a>(&self, options: &'a [String], epsilon: f64) -> Vec<&'a String> {
        let Some(max) = self.max() else {
            return Vec::new();
        };
        options
            .iter()
            .filter(|o| self.votes_for(o) > 0 && max - self.get(o) <= epsilon)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_weighted_sum() {
        let opts = options(&["A", "B"]);
        let votes = vec![
            Vote::new("x", "A", "").with_weight(3.0),
            Vote::new("y", "B", "").with_weight(2.0),
            Vote::new("z", "A", "").with_weight(1.0),
        ];
        let (tally, accepted) = Tally::count(&opts, votes);
        assert_eq!(tally.get("A"), 4.0);
        assert_eq!(tally.get("B"), 2.0);
        assert_eq!(accepted.len(), 3);
        assert_eq!(tally.leaders(&opts, 1e-6), vec!["A"]);
    }

    #[test]
    fn test_unknown_options_are_discarded() {
        let opts = options(&["A"]);
        let (tally, accepted) = Tally::count(&opts, vec![Vote::new("x", "Z", "")]);
        assert_eq!(tally.discarded.len(), 1);
        assert!(accepted.is_empty());
        assert_eq!(tally.get("A"), 0.0);
        assert_eq!(tally.max(), None);
        assert!(tally.leaders(&opts, 1e-6).is_empty());
    }

    #[test]
    fn test_unvoted_options_never_lead() {
        let opts = options(&["A", "B"]);
        let (tally, _) = Tally::count(&opts, vec![Vote::new("x", "A", "").with_weight(0.0)]);
        assert_eq!(tally.max(), Some(0.0));
        assert_eq!(tally.votes_for("B"), 0);
        assert_eq!(tally.leaders(&opts, 1e-6), vec!["A"]);
    }

    #[test]
    fn test_leaders_within_epsilon() {
        let opts = options(&["A", "B", "C"]);
        let votes = vec![
            Vote::new("x", "A", "").with_weight(1.0),
            Vote::new("y", "B", "").with_weight(1.0 + 1e-9),
            Vote::new("z", "C", "").with_weight(0.5),
        ];
        let (tally, _) = Tally::count(&opts, votes);
        assert_eq!(tally.leaders(&opts, 1e-6), vec!["A", "B"]);
    }
}
