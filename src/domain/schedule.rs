use std::cmp::Ordering;

/// One block on a single day's timeline, in minutes from local midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItem {
    pub id: String,
    pub start_minutes: i32,
    pub duration: i32,
}

impl ScheduleItem {
    pub fn new(id: impl Into<String>, start_minutes: i32, duration: i32) -> Self {
        Self {
            id: id.into(),
            start_minutes,
            duration,
        }
    }

    pub fn end_minutes(&self) -> i32 {
        self.start_minutes.saturating_add(self.duration)
    }
}

/// Repositions items so none overlap.
///
/// Items are sorted by start (the pinned item wins ties). Without a pin, or when the pinned id is
/// absent, one forward sweep pushes each item past its predecessor. With a pin, the pinned item
/// keeps its start; items after it cascade forward from its end and items before it cascade
/// backward from its start, never earlier than minute 0. Durations are never changed.
///
/// The result is in processing order.
pub fn resolve_schedule(items: &[ScheduleItem], pinned_id: Option<&str>) -> Vec<ScheduleItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| match a.start_minutes.cmp(&b.start_minutes) {
        Ordering::Equal => match pinned_id {
            Some(pinned) if a.id == pinned && b.id != pinned => Ordering::Less,
            Some(pinned) if b.id == pinned && a.id != pinned => Ordering::Greater,
            _ => Ordering::Equal,
        },
        other => other,
    });

    let fixed_index = pinned_id.and_then(|pinned| sorted.iter().position(|item| item.id == pinned));
    let Some(fixed_index) = fixed_index else {
        cascade_forward(&mut sorted, 0);
        return sorted;
    };

    cascade_forward(&mut sorted, fixed_index);

    let mut next_start = sorted[fixed_index].start_minutes;
    for current in sorted[..fixed_index].iter_mut().rev() {
        let end = current.end_minutes().min(next_start);
        current.start_minutes = end.saturating_sub(current.duration).max(0);
        next_start = current.start_minutes;
    }

    sorted
}

fn cascade_forward(sorted: &mut [ScheduleItem], anchor: usize) {
    let mut prev_end = sorted[anchor].end_minutes();
    for current in sorted[anchor + 1..].iter_mut() {
        if current.start_minutes < prev_end {
            current.start_minutes = prev_end;
        }
        prev_end = current.end_minutes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn starts(items: &[ScheduleItem]) -> HashMap<String, i32> {
        items
            .iter()
            .map(|item| (item.id.clone(), item.start_minutes))
            .collect()
    }

    fn assert_no_overlap(items: &[ScheduleItem]) {
        for (index, left) in items.iter().enumerate() {
            for right in &items[index + 1..] {
                let overlaps = left.start_minutes < right.end_minutes()
                    && right.start_minutes < left.end_minutes();
                assert!(!overlaps, "{left:?} overlaps {right:?}");
            }
        }
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let items = vec![
            ScheduleItem::new("a", 100, i32::MAX),
            ScheduleItem::new("b", 200, 30),
            ScheduleItem::new("c", 50, i32::MAX),
        ];

        let resolved = resolve_schedule(&items, None);
        assert_eq!(starts(&resolved)["b"], i32::MAX);

        let pinned = resolve_schedule(&items, Some("b"));
        let pinned_starts = starts(&pinned);
        assert_eq!(pinned_starts["b"], 200);
        assert_eq!(pinned_starts["a"], 0);
        assert_eq!(pinned_starts["c"], 0);
    }

    #[test]
    fn empty_input_resolves_to_empty_output() {
        assert!(resolve_schedule(&[], Some("a")).is_empty());
    }

    #[test]
    fn single_item_is_unchanged() {
        let items = vec![ScheduleItem::new("a", 600, 30)];
        assert_eq!(resolve_schedule(&items, None), items);
        assert_eq!(resolve_schedule(&items, Some("a")), items);
    }

    #[test]
    fn pinned_item_stays_and_later_item_moves_after_it() {
        let items = vec![ScheduleItem::new("A", 0, 30), ScheduleItem::new("B", 15, 30)];
        let resolved = starts(&resolve_schedule(&items, Some("A")));

        assert_eq!(resolved["A"], 0);
        assert_eq!(resolved["B"], 30);
    }

    #[test]
    fn earlier_item_that_already_fits_before_pin_does_not_move() {
        let items = vec![
            ScheduleItem::new("A", 60, 60),
            ScheduleItem::new("B", 90, 15),
            ScheduleItem::new("C", 0, 90),
        ];
        let resolved = resolve_schedule(&items, Some("B"));
        let by_id = starts(&resolved);

        assert_eq!(by_id["B"], 90);
        assert_eq!(by_id["C"], 0);
        assert!(by_id["C"] + 90 <= 90);
        assert!(by_id["A"] + 60 <= 90);
        assert_eq!(
            resolved.iter().map(|item| item.id.as_str()).collect::<Vec<_>>(),
            vec!["C", "A", "B"]
        );
    }

    #[test]
    fn backward_pass_chains_through_earlier_items() {
        let items = vec![
            ScheduleItem::new("a", 100, 30),
            ScheduleItem::new("b", 120, 30),
            ScheduleItem::new("pin", 130, 30),
        ];
        let resolved = starts(&resolve_schedule(&items, Some("pin")));

        assert_eq!(resolved["pin"], 130);
        assert_eq!(resolved["b"], 100);
        assert_eq!(resolved["a"], 70);
    }

    #[test]
    fn backward_pass_clamps_at_day_start_and_accepts_residual_overlap() {
        let items = vec![ScheduleItem::new("early", 0, 60), ScheduleItem::new("pin", 30, 30)];
        let resolved = starts(&resolve_schedule(&items, Some("pin")));

        assert_eq!(resolved["pin"], 30);
        assert_eq!(resolved["early"], 0);
    }

    #[test]
    fn pinned_item_sorts_first_on_equal_start() {
        let items = vec![ScheduleItem::new("other", 60, 30), ScheduleItem::new("pin", 60, 30)];
        let resolved = resolve_schedule(&items, Some("pin"));

        assert_eq!(resolved[0].id, "pin");
        assert_eq!(starts(&resolved)["other"], 90);
    }

    #[test]
    fn unknown_pin_falls_back_to_forward_sweep() {
        let items = vec![
            ScheduleItem::new("a", 0, 45),
            ScheduleItem::new("b", 30, 30),
            ScheduleItem::new("c", 60, 30),
        ];
        let resolved = starts(&resolve_schedule(&items, Some("missing")));

        assert_eq!(resolved["a"], 0);
        assert_eq!(resolved["b"], 45);
        assert_eq!(resolved["c"], 75);
    }

    #[test]
    fn durations_are_never_changed() {
        let items = vec![
            ScheduleItem::new("a", 10, 50),
            ScheduleItem::new("b", 20, 20),
            ScheduleItem::new("c", 25, 5),
        ];
        let resolved = resolve_schedule(&items, Some("b"));
        for item in resolved {
            let original = items.iter().find(|candidate| candidate.id == item.id).expect("same ids");
            assert_eq!(item.duration, original.duration);
        }
    }

    fn unpinned_items() -> impl Strategy<Value = Vec<ScheduleItem>> {
        prop::collection::vec((0i32..1440, 1i32..180), 0..12).prop_map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(index, (start, duration))| ScheduleItem::new(format!("item-{index}"), start, duration))
                .collect()
        })
    }

    /// The pinned block starts late enough that the backward cascade never reaches minute 0.
    fn pinned_items() -> impl Strategy<Value = (Vec<ScheduleItem>, String)> {
        prop::collection::vec((0i32..1440, 1i32..60), 1..12).prop_flat_map(|pairs| {
            let count = pairs.len();
            let total: i32 = pairs.iter().map(|(_, duration)| *duration).sum();
            (Just(pairs), 0..count, total..total + 600)
        })
        .prop_map(|(pairs, pinned_index, pinned_start)| {
            let items: Vec<ScheduleItem> = pairs
                .into_iter()
                .enumerate()
                .map(|(index, (start, duration))| {
                    let start = if index == pinned_index { pinned_start } else { start };
                    ScheduleItem::new(format!("item-{index}"), start, duration)
                })
                .collect();
            (items, format!("item-{pinned_index}"))
        })
    }

    // Feature: timeblocks, Property 1: resolved blocks never overlap
    proptest! {
        #[test]
        fn property1_forward_sweep_leaves_no_overlap(items in unpinned_items()) {
            assert_no_overlap(&resolve_schedule(&items, None));
        }

        #[test]
        fn property1_pinned_resolution_leaves_no_overlap((items, pinned) in pinned_items()) {
            assert_no_overlap(&resolve_schedule(&items, Some(&pinned)));
        }
    }

    // Feature: timeblocks, Property 2: the pinned block keeps its start
    proptest! {
        #[test]
        fn property2_pinned_start_is_preserved(items in unpinned_items(), pick in any::<prop::sample::Index>()) {
            prop_assume!(!items.is_empty());
            let pinned = items[pick.index(items.len())].clone();
            let resolved = resolve_schedule(&items, Some(&pinned.id));
            let after = resolved.iter().find(|item| item.id == pinned.id).expect("pinned present");
            prop_assert_eq!(after.start_minutes, pinned.start_minutes);
        }
    }

    // Feature: timeblocks, Property 3: no start is ever negative
    proptest! {
        #[test]
        fn property3_starts_are_never_negative(items in unpinned_items(), pick in any::<prop::sample::Index>()) {
            let pinned = if items.is_empty() { None } else { Some(items[pick.index(items.len())].id.clone()) };
            for item in resolve_schedule(&items, pinned.as_deref()) {
                prop_assert!(item.start_minutes >= 0);
            }
        }
    }

    // Feature: timeblocks, Property 4: resolving twice equals resolving once
    proptest! {
        #[test]
        fn property4_resolution_is_idempotent((items, pinned) in pinned_items()) {
            let once = resolve_schedule(&items, Some(&pinned));
            let twice = resolve_schedule(&once, Some(&pinned));
            prop_assert_eq!(starts(&once), starts(&twice));
        }

        #[test]
        fn property4_forward_sweep_is_idempotent(items in unpinned_items()) {
            let once = resolve_schedule(&items, None);
            let twice = resolve_schedule(&once, None);
            prop_assert_eq!(starts(&once), starts(&twice));
        }
    }
}
