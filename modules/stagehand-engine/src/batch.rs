//! Batch grouping.
//!
//! A batch starting at `i` keeps growing into `j` while `steps[j]` has no
//! delay and `steps[j - 1]` opted out of waiting for completion.

use std::ops::Range;

use stagehand_common::{AnimationLike, ElementId, Step};

/// The batch that starts at `start`. Empty when `start` is past the end.
pub fn batch_range<Id: ElementId, A: AnimationLike>(
    steps: &[Step<Id, A>],
    start: usize,
) -> Range<usize> {
    if start >= steps.len() {
        return start..start;
    }

    let mut end = start + 1;
    while end < steps.len()
        && steps[end].delay().is_zero()
        && !steps[end - 1].waits_for_completion()
    {
        end += 1;
    }
    start..end
}

/// Partition the whole list into consecutive batches.
pub fn batches<Id: ElementId, A: AnimationLike>(steps: &[Step<Id, A>]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < steps.len() {
        let range = batch_range(steps, i);
        i = range.end;
        out.push(range);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type S = Step<&'static str, ()>;

    fn step(id: &'static str) -> S {
        Step::transition(id)
    }

    #[test]
    fn empty_list_has_no_batches() {
        let steps: Vec<S> = vec![];
        assert!(batches(&steps).is_empty());
        assert_eq!(batch_range(&steps, 0), 0..0);
    }

    #[test]
    fn waiting_steps_each_form_their_own_batch() {
        let steps = vec![step("a"), step("b"), step("c")];
        assert_eq!(batches(&steps), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn no_wait_followed_by_zero_delay_joins() {
        let steps = vec![step("a").wait_for_completion(false), step("b")];
        assert_eq!(batches(&steps), vec![0..2]);
    }

    #[test]
    fn waiting_step_closes_the_batch() {
        let steps = vec![
            step("a").wait_for_completion(false),
            step("b"),
            step("c").wait_for_completion(false),
        ];
        assert_eq!(batch_range(&steps, 0), 0..2);
        assert_eq!(batches(&steps), vec![0..2, 2..3]);
    }

    #[test]
    fn delayed_step_starts_new_batch_even_after_no_wait() {
        let steps = vec![
            step("a").wait_for_completion(false),
            step("b").with_delay(Duration::from_millis(100)),
        ];
        assert_eq!(batches(&steps), vec![0..1, 1..2]);
    }

    #[test]
    fn leading_delay_does_not_split_its_own_batch() {
        let steps = vec![
            step("a")
                .with_delay(Duration::from_millis(300))
                .wait_for_completion(false),
            step("b").wait_for_completion(false),
            step("c"),
            step("d"),
        ];
        assert_eq!(batches(&steps), vec![0..3, 3..4]);
    }

    #[test]
    fn batch_can_start_mid_list() {
        let steps = vec![
            step("a"),
            step("b").wait_for_completion(false),
            step("c").wait_for_completion(false),
        ];
        assert_eq!(batch_range(&steps, 1), 1..3);
        assert_eq!(batch_range(&steps, 5), 5..5);
    }
}
