//! Choosing the next task to serve.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::completion::CompletionIndex;
use crate::record::Record;

/// Source of presentation order for the task table.
pub trait TaskOrder: Send {
    /// Return a permutation of `0..len`.
    fn permute(&mut self, len: usize) -> Vec<usize>;
}

impl<T: TaskOrder + ?Sized> TaskOrder for Box<T> {
    fn permute(&mut self, len: usize) -> Vec<usize> {
        (**self).permute(len)
    }
}

/// Uniformly random order backed by a [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomOrder {
    rng: StdRng,
}

impl RandomOrder {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic order for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TaskOrder for RandomOrder {
    fn permute(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

/// Progress snapshot handed to the renderer for one "next task" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// First uncompleted task in shuffled order, if any remain.
    pub task: Option<Record>,
    /// Rows in the output table at read time.
    pub num_completed: usize,
    /// Rows in the task table.
    pub num_total: usize,
}

impl TaskStats {
    pub fn is_done(&self) -> bool {
        self.task.is_none()
    }
}

pub struct TaskSelector<O: TaskOrder> {
    order: O,
}

impl<O: TaskOrder> TaskSelector<O> {
    pub fn new(order: O) -> Self {
        Self { order }
    }

    /// Shuffle `tasks` and return the first one `index` does not cover.
    ///
    /// `num_completed` is the output row count, which can exceed the number of
    /// tasks actually covered when the output table holds unrelated rows.
    pub fn select_next(&mut self, tasks: Vec<Record>, index: &CompletionIndex) -> TaskStats {
        let num_total = tasks.len();
        let mut slots: Vec<Option<Record>> = tasks.into_iter().map(Some).collect();

        let mut next = None;
        for idx in self.order.permute(num_total) {
            let Some(task) = slots.get_mut(idx).and_then(Option::take) else {
                continue;
            };
            if !index.contains(&task) {
                next = Some(task);
                break;
            }
        }

        TaskStats {
            task: next,
            num_completed: index.len(),
            num_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed permutation.
    struct FixedOrder(Vec<usize>);

    impl TaskOrder for FixedOrder {
        fn permute(&mut self, len: usize) -> Vec<usize> {
            assert_eq!(self.0.len(), len);
            self.0.clone()
        }
    }

    fn task(id: &str) -> Record {
        [("id", id)].into_iter().collect()
    }

    fn tasks(n: usize) -> Vec<Record> {
        (0..n).map(|i| task(&i.to_string())).collect()
    }

    #[test]
    fn picks_first_uncompleted_in_given_order() {
        let index = CompletionIndex::build(vec![task("2")]);
        let mut selector = TaskSelector::new(FixedOrder(vec![2, 0, 1]));

        let stats = selector.select_next(tasks(3), &index);
        assert_eq!(stats.task, Some(task("0")));
        assert_eq!(stats.num_total, 3);
        assert_eq!(stats.num_completed, 1);
    }

    #[test]
    fn empty_task_table_is_done() {
        let mut selector = TaskSelector::new(RandomOrder::seeded(1));
        let stats = selector.select_next(Vec::new(), &CompletionIndex::default());
        assert!(stats.is_done());
        assert_eq!(stats.num_total, 0);
        assert_eq!(stats.num_completed, 0);
    }

    #[test]
    fn counts_include_unrelated_outputs() {
        let index = CompletionIndex::build(vec![
            task("0"),
            [("other", "x")].into_iter().collect(),
            [("other", "y")].into_iter().collect(),
        ]);
        let mut selector = TaskSelector::new(RandomOrder::seeded(7));

        let stats = selector.select_next(tasks(2), &index);
        assert_eq!(stats.task, Some(task("1")));
        assert_eq!(stats.num_completed, 3);
        assert_eq!(stats.num_total, 2);
    }

    #[test]
    fn all_completed_yields_no_task() {
        let index = CompletionIndex::build(tasks(4));
        let mut selector = TaskSelector::new(RandomOrder::seeded(3));
        let stats = selector.select_next(tasks(4), &index);
        assert!(stats.is_done());
        assert_eq!(stats.num_total, 4);
    }

    #[test]
    fn random_order_is_a_permutation() {
        let mut order = RandomOrder::seeded(42);
        for len in [0, 1, 5, 50] {
            let mut perm = order.permute(len);
            perm.sort_unstable();
            assert_eq!(perm, (0..len).collect::<Vec<_>>());
        }
    }

    #[test]
    fn seeded_orders_are_reproducible() {
        let a = RandomOrder::seeded(9).permute(20);
        let b = RandomOrder::seeded(9).permute(20);
        assert_eq!(a, b);
    }

    #[test]
    fn every_task_can_come_first() {
        let mut selector = TaskSelector::new(RandomOrder::seeded(11));
        let index = CompletionIndex::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let stats = selector.select_next(tasks(4), &index);
            seen.insert(stats.task.expect("task").get("id").unwrap_or_default().to_string());
        }
        assert_eq!(seen.len(), 4);
    }
}
