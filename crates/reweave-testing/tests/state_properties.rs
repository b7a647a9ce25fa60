//! Property tests for state preservation under arbitrary update sequences.

use std::cell::RefCell;

use proptest::prelude::*;

use reweave_core::{Element, Props, RenderError, Scope, SetState};
use reweave_testing::RenderTest;

thread_local! {
    static SETTER: RefCell<Option<SetState<i64>>> = RefCell::new(None);
}

fn counter(scope: &mut Scope, _props: &Props) -> Result<Element, RenderError> {
    let (count, set_count) = scope.use_state(|| 0i64)?;
    SETTER.with(|slot| *slot.borrow_mut() = Some(set_count));
    Ok(Element::host(
        "p",
        Props::new().child(format!("{count}")),
    ))
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Replace(i64),
    Add(i64),
    ReRender,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (-1000i64..1000).prop_map(Step::Replace),
        (-10i64..10).prop_map(Step::Add),
        Just(Step::ReRender),
    ]
}

fn committed_value(harness: &RenderTest) -> i64 {
    let p = harness.top_host_child().expect("counter paragraph");
    harness.with_host(|host| {
        let text = host.child_ids(p)[0];
        host.text(text).unwrap_or_default().parse().unwrap_or(i64::MIN)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever mix of replacements, increments, and no-op re-renders is
    /// applied, the committed host text always equals a plain fold of the
    /// same steps, and the unit keeps exactly one state cell.
    #[test]
    fn committed_state_matches_a_plain_fold(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let mut harness = RenderTest::new();
        harness.render(Element::component(counter)).unwrap();

        let mut model = 0i64;
        for step in &steps {
            let setter = SETTER.with(|slot| slot.borrow().clone()).unwrap();
            match *step {
                Step::Replace(value) => {
                    setter.set(value);
                    model = value;
                }
                Step::Add(delta) => {
                    setter.update(move |n| n + delta);
                    model += delta;
                }
                Step::ReRender => {
                    harness.render(Element::component(counter)).unwrap();
                }
            }
            prop_assert_eq!(committed_value(&harness), model);
        }

        // One cell, before and after the churn.
        harness.root().with_tree(|arena, live| {
            let mut stack = vec![live];
            let mut cells = Vec::new();
            while let Some(id) = stack.pop() {
                let node = arena.get(id).unwrap();
                if let Some(hooks) = node.memoized_state.hook_cells() {
                    cells.push(hooks.len());
                }
                stack.extend(arena.children_of(id).unwrap());
            }
            assert_eq!(cells, vec![1]);
        });
    }
}
