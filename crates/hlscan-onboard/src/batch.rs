/// Split `items` into consecutive batches of `batch_size`.
///
/// When that would give more than `max_batches` batches, exactly
/// `max_batches` batches are made instead, sized as evenly as possible with
/// the first `len % max_batches` batches one item larger. Order is kept and
/// every item lands in exactly one batch.
pub fn plan_batches<T>(items: Vec<T>, batch_size: usize, max_batches: Option<usize>) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let count = items.len().div_ceil(batch_size);

    let sizes: Vec<usize> = match max_batches {
        Some(max) if max > 0 && count > max => {
            let base = items.len() / max;
            let extra = items.len() % max;
            (0..max).map(|i| base + usize::from(i < extra)).collect()
        }
        _ => (0..count)
            .map(|i| batch_size.min(items.len() - i * batch_size))
            .collect(),
    };

    let mut rest = items.into_iter();
    sizes
        .into_iter()
        .map(|size| rest.by_ref().take(size).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens<T>(batches: &[Vec<T>]) -> Vec<usize> {
        batches.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_fixed_size_batches() {
        let batches = plan_batches((1..=7).collect(), 3, None);
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn test_capped_batches_spread_remainder_first() {
        let batches = plan_batches((1..=10).collect::<Vec<_>>(), 2, Some(3));
        assert_eq!(lens(&batches), vec![4, 3, 3]);
        assert_eq!(batches[0], vec![1, 2, 3, 4]);
        assert_eq!(batches[2], vec![8, 9, 10]);
    }

    #[test]
    fn test_cap_not_reached_keeps_batch_size() {
        let batches = plan_batches((1..=4).collect::<Vec<_>>(), 2, Some(5));
        assert_eq!(lens(&batches), vec![2, 2]);
    }

    #[test]
    fn test_empty_input() {
        assert!(plan_batches(Vec::<u8>::new(), 4, Some(2)).is_empty());
    }
}
