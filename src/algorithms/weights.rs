// Urgency to routing-penalty translation
//
// The penalty is the only channel through which urgency reaches the trip
// solver, which keeps the solver itself priority-agnostic.

use crate::config::WeightConfig;
use crate::error::{DispatchError, Result};
use crate::models::{Seconds, Urgency, LEAST_URGENT, MOST_URGENT};

/// Linear interpolation from `base_penalty` (most urgent) to `max_penalty`
/// (least urgent), evenly spaced across the ordinals in between
pub fn routing_weight(urgency: Urgency, base_penalty: Seconds, max_penalty: Seconds) -> Result<Seconds> {
    if !(MOST_URGENT..=LEAST_URGENT).contains(&urgency) {
        return Err(DispatchError::OutOfRange {
            value: urgency as i64,
            min: MOST_URGENT as i64,
            max: LEAST_URGENT as i64,
        });
    }

    let steps = (LEAST_URGENT - MOST_URGENT) as f64;
    let position = (urgency - MOST_URGENT) as f64;
    Ok(base_penalty + position * (max_penalty - base_penalty) / steps)
}

/// Routing weights bound to a validated penalty range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightPolicy {
    base_penalty: Seconds,
    max_penalty: Seconds,
}

impl WeightPolicy {
    pub fn new(base_penalty: Seconds, max_penalty: Seconds) -> Result<Self> {
        if !(base_penalty >= 0.0 && base_penalty < max_penalty && max_penalty.is_finite()) {
            return Err(DispatchError::Config(format!(
                "invalid penalty range {}..{}",
                base_penalty, max_penalty
            )));
        }
        Ok(Self {
            base_penalty,
            max_penalty,
        })
    }

    pub fn weight(&self, urgency: Urgency) -> Result<Seconds> {
        routing_weight(urgency, self.base_penalty, self.max_penalty)
    }

    pub fn base_penalty(&self) -> Seconds {
        self.base_penalty
    }

    pub fn max_penalty(&self) -> Seconds {
        self.max_penalty
    }
}

impl TryFrom<&WeightConfig> for WeightPolicy {
    type Error = DispatchError;

    fn try_from(config: &WeightConfig) -> Result<Self> {
        WeightPolicy::new(config.base_penalty, config.max_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_and_even_spacing() {
        let weights: Vec<Seconds> = (1..=5)
            .map(|u| routing_weight(u, 3600.0, 7200.0).unwrap())
            .collect();

        assert_eq!(weights, vec![3600.0, 4500.0, 5400.0, 6300.0, 7200.0]);
        for pair in weights.windows(2) {
            assert_eq!(pair[1] - pair[0], 900.0);
        }
    }

    #[test]
    fn test_more_urgent_never_weighs_more() {
        let policy = WeightPolicy::new(0.0, 100.0).unwrap();
        for u in 1..5 {
            assert!(policy.weight(u).unwrap() <= policy.weight(u + 1).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_urgency() {
        for u in [0u8, 6, 200] {
            assert_eq!(
                routing_weight(u, 3600.0, 7200.0),
                Err(DispatchError::OutOfRange {
                    value: u as i64,
                    min: 1,
                    max: 5
                })
            );
        }
    }

    #[test]
    fn test_policy_rejects_bad_range() {
        assert!(WeightPolicy::new(7200.0, 3600.0).is_err());
        assert!(WeightPolicy::new(100.0, 100.0).is_err());
        assert!(WeightPolicy::new(-1.0, 100.0).is_err());
    }
}
