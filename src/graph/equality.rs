use crate::graph::weight::{MessageWeight, StdWeight, WeightStore};

// Interface binding an equality rule and its weight storage to a graph.
//
// The algorithm is chosen once, at graph construction, through this trait's
// type parameter; the per-iteration hot path carries no algorithm branches
// and ADMM edges spend no storage on weights.
pub trait Algorithm: Send + Sync + 'static {
    // Per-edge storage for the two directional message weights
    type Weight: WeightStore;

    const NAME: &'static str;

    // Folds the messages-to-variable of the enabled incident edges into the
    // consensus pair broadcast back to all of them. Returns None when the
    // variable has no enabled edges, which leaves it unchanged.
    fn consensus<I>(messages: I) -> Option<(f64, MessageWeight)>
    where
        I: Iterator<Item = (f64, MessageWeight)>;
}

// Alternating Direction Method of Multipliers: equality by plain averaging,
// every message carries standard weight.
pub struct Admm;

impl Algorithm for Admm {
    type Weight = StdWeight;

    const NAME: &'static str = "ADMM";

    fn consensus<I>(messages: I) -> Option<(f64, MessageWeight)>
    where
        I: Iterator<Item = (f64, MessageWeight)>,
    {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (value, _weight) in messages {
            sum += value;
            count += 1;
        }
        (count > 0).then(|| (sum / count as f64, MessageWeight::Std))
    }
}

// Three-Weight Algorithm: certainty wins on first sight, otherwise the mean
// over informative messages, falling back to the mean over all of them.
pub struct ThreeWeight;

impl Algorithm for ThreeWeight {
    type Weight = MessageWeight;

    const NAME: &'static str = "TWA";

    fn consensus<I>(messages: I) -> Option<(f64, MessageWeight)>
    where
        I: Iterator<Item = (f64, MessageWeight)>,
    {
        let mut messages = messages;
        let mut nz_sum = 0.0;
        let mut nz_count = 0usize;
        let mut all_sum = 0.0;
        let mut all_count = 0usize;

        while let Some((value, weight)) = messages.next() {
            if weight == MessageWeight::Inf {
                // Clients must never assert two conflicting certain values
                // on one variable; the first one encountered wins.
                if cfg!(debug_assertions) {
                    for (other, other_weight) in messages {
                        debug_assert!(
                            other_weight != MessageWeight::Inf || other == value,
                            "conflicting certain values {} and {} on one variable",
                            value,
                            other
                        );
                    }
                }
                return Some((value, MessageWeight::Inf));
            }
            if weight != MessageWeight::Zero {
                nz_sum += value;
                nz_count += 1;
            }
            all_sum += value;
            all_count += 1;
        }

        if nz_count > 0 {
            Some((nz_sum / nz_count as f64, MessageWeight::Std))
        } else if all_count > 0 {
            Some((all_sum / all_count as f64, MessageWeight::Std))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STD: MessageWeight = MessageWeight::Std;
    const ZERO: MessageWeight = MessageWeight::Zero;
    const INF: MessageWeight = MessageWeight::Inf;

    #[test]
    fn admm_takes_the_mean_with_std_weight() {
        let messages = [(1.0, STD), (2.0, STD), (6.0, STD)];
        let (value, weight) = Admm::consensus(messages.into_iter()).unwrap();
        assert_abs_diff_eq!(value, 3.0);
        assert_eq!(weight, STD);
    }

    #[test]
    fn admm_skips_an_empty_edge_set() {
        assert_eq!(Admm::consensus(std::iter::empty()), None);
    }

    #[test]
    fn twa_averages_only_informative_messages() {
        let messages = [(100.0, ZERO), (2.0, STD), (4.0, STD)];
        let (value, weight) = ThreeWeight::consensus(messages.into_iter()).unwrap();
        assert_abs_diff_eq!(value, 3.0);
        assert_eq!(weight, STD);
    }

    #[test]
    fn twa_falls_back_to_the_mean_over_all_zero_messages() {
        let messages = [(1.0, ZERO), (5.0, ZERO)];
        let (value, weight) = ThreeWeight::consensus(messages.into_iter()).unwrap();
        assert_abs_diff_eq!(value, 3.0);
        assert_eq!(weight, STD);
    }

    #[test]
    fn twa_certainty_wins_on_first_sight() {
        let messages = [(2.0, STD), (7.0, INF), (4.0, STD)];
        let (value, weight) = ThreeWeight::consensus(messages.into_iter()).unwrap();
        assert_eq!(value, 7.0);
        assert_eq!(weight, INF);
    }

    #[test]
    fn twa_skips_an_empty_edge_set() {
        assert_eq!(ThreeWeight::consensus(std::iter::empty()), None);
    }
}
