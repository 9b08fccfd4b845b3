use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::types::AllocationMode;
use crate::utils::pad2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("la cantidad de boletos debe estar entre 1 y 99, se pidió {0}")]
    QuantityOutOfRange(u32),
    #[error(
        "el pozo de oportunidades no alcanza: se necesitan {required} números y hay {available}"
    )]
    PoolMismatch { required: usize, available: usize },
}

/// How many chance numbers each ticket carries, per raffle size.
/// The table comes straight from how these raffles are sold: 25 boletos
/// with 3 oportunidades, 33 with 2, 50 with 1.
pub fn extras_per_ticket(quantity: u32) -> usize {
    match quantity {
        25 => 3,
        33 => 2,
        50 => 1,
        _ => 1,
    }
}

/// Checks that `extras_per_ticket × quantity` draws can consume the
/// complement pool exactly, and whether "00" is part of it.
///
/// The pool is every number not used as a primary ticket: quantity+1..=99,
/// plus "00" when the count would otherwise fall one short (N=25 and N=50
/// wrap through 100; N=33 fills 34..=99 exactly). Any other size cannot be
/// partitioned cleanly and is rejected instead of silently shorting the
/// trailing tickets.
fn chance_slots(quantity: u32) -> Result<(usize, bool), AllocationError> {
    if quantity == 0 || quantity > 99 {
        return Err(AllocationError::QuantityOutOfRange(quantity));
    }

    let chances = extras_per_ticket(quantity);
    let required = chances * quantity as usize;
    let available = (99 - quantity) as usize;

    if required == available {
        Ok((chances, false))
    } else if required == available + 1 {
        Ok((chances, true))
    } else {
        Err(AllocationError::PoolMismatch {
            required,
            available,
        })
    }
}

/// Full complement pool in ascending order, "00" last when present.
pub fn build_chance_pool(quantity: u32) -> Result<Vec<String>, AllocationError> {
    let (_, include_zero) = chance_slots(quantity)?;

    let mut pool: Vec<String> = (quantity + 1..=99).map(pad2).collect();
    if include_zero {
        pool.push("00".to_string());
    }
    Ok(pool)
}

/// Assigns every ticket 1..=quantity its chance numbers.
///
/// Linear mode is a fixed-offset formula: ticket i takes i+N, i+2N, ...,
/// one number per band, 100 wrapping to "00". Each band is a shifted copy
/// of 1..=N, so the bands partition the pool with no bookkeeping.
///
/// Random mode shuffles the whole pool (Fisher-Yates) and deals it off the
/// front, `extras_per_ticket` numbers per ticket, then sorts each ticket's
/// own hand for display.
pub fn allocate(quantity: u32, mode: AllocationMode) -> Result<Vec<Vec<String>>, AllocationError> {
    allocate_with_rng(quantity, mode, &mut rand::thread_rng())
}

pub fn allocate_with_rng<R: Rng + ?Sized>(
    quantity: u32,
    mode: AllocationMode,
    rng: &mut R,
) -> Result<Vec<Vec<String>>, AllocationError> {
    let (chances, _) = chance_slots(quantity)?;

    match mode {
        AllocationMode::Linear => {
            let tickets = (1..=quantity)
                .map(|i| (1..=chances as u32).map(|band| pad2(i + band * quantity)).collect())
                .collect();
            Ok(tickets)
        }
        AllocationMode::Random => {
            let mut pool = build_chance_pool(quantity)?;
            pool.shuffle(rng);

            let tickets = pool
                .chunks_exact(chances)
                .map(|hand| {
                    let mut hand = hand.to_vec();
                    hand.sort();
                    hand
                })
                .collect();
            Ok(tickets)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn extras_table() {
        assert_eq!(extras_per_ticket(25), 3);
        assert_eq!(extras_per_ticket(33), 2);
        assert_eq!(extras_per_ticket(50), 1);
        assert_eq!(extras_per_ticket(40), 1);
    }

    #[test]
    fn pool_includes_zero_only_when_needed() {
        let pool25 = build_chance_pool(25).unwrap();
        assert_eq!(pool25.len(), 75);
        assert_eq!(pool25.first().map(String::as_str), Some("26"));
        assert_eq!(pool25.last().map(String::as_str), Some("00"));

        let pool33 = build_chance_pool(33).unwrap();
        assert_eq!(pool33.len(), 66);
        assert!(!pool33.contains(&"00".to_string()));

        let pool50 = build_chance_pool(50).unwrap();
        assert_eq!(pool50.len(), 50);
        assert!(pool50.contains(&"00".to_string()));
    }

    #[test]
    fn unconfigured_sizes_fail_fast() {
        assert_eq!(
            build_chance_pool(40),
            Err(AllocationError::PoolMismatch {
                required: 40,
                available: 59
            })
        );
        assert_eq!(
            allocate(40, AllocationMode::Linear),
            Err(AllocationError::PoolMismatch {
                required: 40,
                available: 59
            })
        );
    }

    #[test]
    fn quantity_bounds() {
        assert_eq!(
            build_chance_pool(0),
            Err(AllocationError::QuantityOutOfRange(0))
        );
        assert_eq!(
            build_chance_pool(100),
            Err(AllocationError::QuantityOutOfRange(100))
        );
    }

    #[test]
    fn linear_33_bands() {
        let tickets = allocate(33, AllocationMode::Linear).unwrap();
        assert_eq!(tickets.len(), 33);
        assert_eq!(tickets[0], vec!["34", "67"]);
        assert_eq!(tickets[32], vec!["66", "99"]);
    }

    #[test]
    fn linear_25_wraps_through_zero() {
        let tickets = allocate(25, AllocationMode::Linear).unwrap();
        assert_eq!(tickets[0], vec!["26", "51", "76"]);
        assert_eq!(tickets[24], vec!["50", "75", "00"]);
    }

    #[test]
    fn linear_50_single_band() {
        let tickets = allocate(50, AllocationMode::Linear).unwrap();
        assert_eq!(tickets[0], vec!["51"]);
        assert_eq!(tickets[49], vec!["00"]);
    }

    #[test]
    fn linear_is_deterministic() {
        for quantity in [25, 33, 50] {
            let a = allocate(quantity, AllocationMode::Linear).unwrap();
            let b = allocate(quantity, AllocationMode::Linear).unwrap();
            assert_eq!(a, b);
        }
    }

    fn assert_covers_pool(quantity: u32, tickets: &[Vec<String>]) {
        let chances = extras_per_ticket(quantity);
        let mut seen = HashSet::new();

        for hand in tickets {
            assert_eq!(hand.len(), chances);
            for extra in hand {
                assert!(seen.insert(extra.clone()), "duplicate extra {}", extra);
            }
        }

        let pool: HashSet<String> = build_chance_pool(quantity).unwrap().into_iter().collect();
        assert_eq!(seen, pool);

        // No primary ticket number ever doubles as an extra.
        for primary in 1..=quantity {
            assert!(!seen.contains(&pad2(primary)));
        }
    }

    #[test]
    fn linear_covers_pool_exactly() {
        for quantity in [25, 33, 50] {
            let tickets = allocate(quantity, AllocationMode::Linear).unwrap();
            assert_covers_pool(quantity, &tickets);
        }
    }

    #[test]
    fn random_covers_pool_exactly() {
        for quantity in [25, 33, 50] {
            for seed in 0..5 {
                let mut rng = StdRng::seed_from_u64(seed);
                let tickets =
                    allocate_with_rng(quantity, AllocationMode::Random, &mut rng).unwrap();
                assert_eq!(tickets.len(), quantity as usize);
                assert_covers_pool(quantity, &tickets);
            }
        }
    }

    #[test]
    fn random_hands_are_sorted_for_display() {
        let mut rng = StdRng::seed_from_u64(7);
        let tickets = allocate_with_rng(25, AllocationMode::Random, &mut rng).unwrap();
        for hand in &tickets {
            let mut sorted = hand.clone();
            sorted.sort();
            assert_eq!(*hand, sorted);
        }
    }
}
