//! Completion lookups over the output table.

use std::collections::HashMap;

use crate::record::Record;

/// Answers "has a record equivalent to this task already been submitted?".
///
/// Built fresh from the output table for each request. A task counts as done
/// when some output row, after normalization, contains every field of the
/// normalized task with the same value. Output rows may carry extra fields
/// (worker id, answers) that the task does not have.
#[derive(Debug, Default)]
pub struct CompletionIndex {
    outputs: Vec<Record>,
    /// (key, normalized value) -> indices into `outputs`. Only narrows the
    /// candidate set; the superset check still decides.
    postings: HashMap<(String, String), Vec<usize>>,
}

impl CompletionIndex {
    pub fn build<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let outputs: Vec<Record> = outputs.into_iter().map(|r| r.normalized()).collect();
        let mut postings: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (idx, row) in outputs.iter().enumerate() {
            for (k, v) in row.iter() {
                postings
                    .entry((k.to_string(), v.to_string()))
                    .or_default()
                    .push(idx);
            }
        }
        Self { outputs, postings }
    }

    /// Number of output rows the index was built from.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn contains(&self, task: &Record) -> bool {
        let task = task.normalized();

        // Pick the rarest field of the task to drive the scan.
        let mut narrowest: Option<&Vec<usize>> = None;
        for (k, v) in task.iter() {
            match self.postings.get(&(k.to_string(), v.to_string())) {
                None => return false,
                Some(ids) => {
                    if narrowest.map_or(true, |best| ids.len() < best.len()) {
                        narrowest = Some(ids);
                    }
                }
            }
        }

        match narrowest {
            Some(ids) => ids
                .iter()
                .any(|&idx| self.outputs[idx].is_superset_of(&task)),
            // A task with no fields is covered by any output row at all.
            None => !self.outputs.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn linear_contains(outputs: &[Record], task: &Record) -> bool {
        let task = task.normalized();
        outputs
            .iter()
            .any(|o| o.normalized().is_superset_of(&task))
    }

    #[test]
    fn superset_match_not_equality() {
        let task = rec(&[("a", "1"), ("b", "2")]);

        let done = CompletionIndex::build(vec![rec(&[("a", "1"), ("b", "2"), ("uid", "bob")])]);
        assert!(done.contains(&task));

        let partial = CompletionIndex::build(vec![rec(&[("a", "1")])]);
        assert!(!partial.contains(&task));
    }

    #[test]
    fn matches_across_whitespace_differences() {
        let index = CompletionIndex::build(vec![rec(&[
            ("text", "hello\r\nworld  "),
            ("label", "greeting"),
        ])]);
        assert!(index.contains(&rec(&[("text", "  hello\nworld")])));
    }

    #[test]
    fn empty_index_contains_nothing() {
        let index = CompletionIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(!index.contains(&rec(&[("a", "1")])));
        assert!(!index.contains(&Record::new()));
    }

    #[test]
    fn fieldless_task_is_covered_by_any_output() {
        let index = CompletionIndex::build(vec![rec(&[("x", "1")])]);
        assert!(index.contains(&Record::new()));
    }

    #[test]
    fn more_outputs_never_uncomplete_a_task() {
        let task = rec(&[("a", "1"), ("b", "2")]);
        let mut outputs = vec![rec(&[("a", "1"), ("b", "2"), ("uid", "u")])];
        assert!(CompletionIndex::build(outputs.clone()).contains(&task));

        for extra in [
            rec(&[("a", "1")]),
            rec(&[("a", "9"), ("b", "2")]),
            rec(&[("z", "z")]),
            rec(&[("a", "1"), ("b", "2")]),
        ] {
            outputs.push(extra);
            assert!(CompletionIndex::build(outputs.clone()).contains(&task));
        }
    }

    #[test]
    fn agrees_with_linear_scan() {
        let outputs = vec![
            rec(&[("a", "1"), ("b", "2"), ("uid", "x")]),
            rec(&[("a", "1"), ("b", "3")]),
            rec(&[("a", " 2 "), ("c", "")]),
            rec(&[("b", "2")]),
        ];
        let tasks = vec![
            rec(&[("a", "1"), ("b", "2")]),
            rec(&[("a", "1"), ("b", "3")]),
            rec(&[("a", "2")]),
            rec(&[("a", "2"), ("c", "")]),
            rec(&[("c", "")]),
            rec(&[("b", "2"), ("uid", "y")]),
            rec(&[("d", "4")]),
            Record::new(),
        ];
        let index = CompletionIndex::build(outputs.clone());
        for task in &tasks {
            assert_eq!(
                index.contains(task),
                linear_contains(&outputs, task),
                "task {:?}",
                task
            );
        }
        assert_eq!(index.len(), 4);
    }
}
