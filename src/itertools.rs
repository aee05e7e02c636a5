use itertools::Itertools;

pub(crate) trait InPlaceReduce: Iterator + Sized {
    fn reduce_inplace<F>(mut self, mut f: F) -> Option<<Self as Iterator>::Item>
    where
        F: FnMut(&mut <Self as Iterator>::Item, &<Self as Iterator>::Item),
    {
        match self.next() {
            Some(mut i) => {
                self.for_each(|e| f(&mut i, &e));
                Some(i)
            }
            _ => None,
        }
    }
}

impl<T> InPlaceReduce for T where T: Iterator + Sized {}

/// Merges already sorted iterators into one sorted, deduplicated iterator.
pub(crate) fn merge_dedup<I, T>(iterators: I) -> impl Iterator<Item = T>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = T>,
    T: PartialOrd + PartialEq,
{
    iterators.into_iter().kmerge().dedup()
}

mod test_itertools {

    #[test]
    fn test_inplace_reduce() {
        use super::InPlaceReduce;

        let sum_all = |a: &mut i32, i: &i32| *a += i;

        let vs: Vec<i32> = vec![];
        assert_eq!(vs.into_iter().reduce_inplace(sum_all), None);

        let vs = vec![1];
        assert_eq!(vs.into_iter().reduce_inplace(sum_all), Some(1));

        let vs = vec![1, 2, 3];
        assert_eq!(vs.into_iter().reduce_inplace(sum_all), Some(6));
    }

    #[test]
    fn test_merge_dedup() {
        use super::merge_dedup;

        let merged: Vec<u32> = merge_dedup(vec![vec![1, 4, 9], vec![], vec![2, 4, 10]]).collect();
        assert_eq!(merged, vec![1, 2, 4, 9, 10]);

        let none: Vec<u32> = merge_dedup(Vec::<Vec<u32>>::new()).collect();
        assert!(none.is_empty());
    }
}
