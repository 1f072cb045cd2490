use rayon::prelude::*;

/// Parallel-for over a mutable slice with static-style partitioning.
///
/// The closure receives the element index and the element. When
/// `in_parallel` is false the same loop runs sequentially; callers never
/// branch on the execution mode themselves.
pub fn for_each_mut<T, F>(items: &mut [T], in_parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    if in_parallel {
        let chunk = (items.len() / rayon::current_num_threads()).max(1);
        items
            .par_iter_mut()
            .with_min_len(chunk)
            .enumerate()
            .for_each(|(index, item)| f(index, item));
    } else {
        for (index, item) in items.iter_mut().enumerate() {
            f(index, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_and_parallel_agree() {
        let mut sequential: Vec<u64> = (0..1000).collect();
        let mut parallel: Vec<u64> = (0..1000).collect();

        for_each_mut(&mut sequential, false, |index, item| {
            *item = *item * 2 + index as u64
        });
        for_each_mut(&mut parallel, true, |index, item| {
            *item = *item * 2 + index as u64
        });

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_each_element_touched_once() {
        let mut counts = vec![0u32; 257];
        for_each_mut(&mut counts, true, |_, item| *item += 1);
        assert!(counts.iter().all(|&c| c == 1));
    }
}
