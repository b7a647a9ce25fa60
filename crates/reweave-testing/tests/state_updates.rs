//! State preservation and update-queue semantics across render passes.

use std::cell::RefCell;
use std::rc::Rc;

use reweave_core::{Element, Props, RenderError, Scope, SetState};
use reweave_testing::{run_render_test, RenderTest};

thread_local! {
    static COUNTER: RefCell<Option<SetState<i64>>> = RefCell::new(None);
    static LABEL: RefCell<Option<SetState<String>>> = RefCell::new(None);
    static CELL_LOG: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

fn counter(scope: &mut Scope, _props: &Props) -> Result<Element, RenderError> {
    let (count, set_count) = scope.use_state(|| 1210i64)?;
    COUNTER.with(|slot| *slot.borrow_mut() = Some(set_count));
    Ok(Element::host(
        "p",
        Props::new().child(format!("count: {count}")),
    ))
}

fn two_cells(scope: &mut Scope, _props: &Props) -> Result<Element, RenderError> {
    let (count, set_count) = scope.use_state(|| 0i64)?;
    let (label, set_label) = scope.use_state(|| "idle".to_string())?;
    CELL_LOG.with(|log| log.borrow_mut().push(scope.cell_count()));
    COUNTER.with(|slot| *slot.borrow_mut() = Some(set_count));
    LABEL.with(|slot| *slot.borrow_mut() = Some(set_label));
    Ok(Element::host(
        "p",
        Props::new().child(format!("{label}: {count}")),
    ))
}

fn counter_setter() -> SetState<i64> {
    COUNTER.with(|slot| slot.borrow().clone()).expect("setter captured")
}

fn paragraph_text(harness: &RenderTest) -> String {
    let p = harness.top_host_child().expect("one paragraph");
    harness.with_host(|host| {
        let text = host.child_ids(p)[0];
        host.text(text).unwrap_or_default().to_string()
    })
}

#[test]
fn increment_action_computes_from_previous_state() {
    run_render_test(|harness| {
        harness.render(Element::component(counter)).unwrap();
        assert_eq!(paragraph_text(harness), "count: 1210");

        counter_setter().update(|n| n + 1);
        assert_eq!(paragraph_text(harness), "count: 1211");
    });
}

#[test]
fn replacement_action_ignores_previous_state() {
    run_render_test(|harness| {
        harness.render(Element::component(counter)).unwrap();
        counter_setter().set(5);
        assert_eq!(paragraph_text(harness), "count: 5");
    });
}

#[test]
fn each_dispatch_runs_its_own_synchronous_pass() {
    run_render_test(|harness| {
        harness.render(Element::component(counter)).unwrap();

        let setter = counter_setter();
        setter.set(5);
        assert_eq!(paragraph_text(harness), "count: 5");
        // The next dispatch computes from the state the previous pass
        // committed, not from the mount value.
        setter.update(|n| n + 1);
        assert_eq!(paragraph_text(harness), "count: 6");
    });
}

#[test]
fn cell_count_and_order_stay_fixed_across_passes() {
    CELL_LOG.with(|log| log.borrow_mut().clear());
    run_render_test(|harness| {
        harness.render(Element::component(two_cells)).unwrap();
        assert_eq!(paragraph_text(harness), "idle: 0");

        counter_setter().update(|n| n + 1);
        assert_eq!(paragraph_text(harness), "idle: 1");

        LABEL.with(|slot| slot.borrow().clone()).unwrap().set("busy".to_string());
        assert_eq!(paragraph_text(harness), "busy: 1");

        // Both cells were walked on every one of the three passes.
        CELL_LOG.with(|log| assert_eq!(*log.borrow(), vec![2, 2, 2]));
    });
}

#[test]
fn growing_the_cell_list_is_a_fatal_usage_error() {
    fn growing(scope: &mut Scope, props: &Props) -> Result<Element, RenderError> {
        scope.use_state(|| 0i32)?;
        if props.attr_value("grow").is_some() {
            scope.use_state(|| 0i32)?;
        }
        Ok(Element::text("x"))
    }

    run_render_test(|harness| {
        let base = Element::component(growing);
        harness.render(base).unwrap();

        let err = harness
            .render(Element::from_component(
                reweave_core::Component::new(growing),
                Props::new().attr("grow", "1"),
            ))
            .unwrap_err();
        assert!(matches!(err, RenderError::Hook(_)));
    });
}

#[test]
fn state_survives_sibling_churn() {
    fn stateful_row(scope: &mut Scope, props: &Props) -> Result<Element, RenderError> {
        let (count, set) = scope.use_state(|| 100i64)?;
        COUNTER.with(|slot| *slot.borrow_mut() = Some(set));
        let label = props.attr_value("label").unwrap_or("row").to_string();
        Ok(Element::host(
            "li",
            Props::new().child(format!("{label}:{count}")),
        ))
    }

    run_render_test(|harness| {
        let list = |trailing: &str| {
            Element::host(
                "ul",
                Props::new()
                    .child(Element::from_component(
                        reweave_core::Component::new(stateful_row),
                        Props::new().attr("label", "row"),
                    ))
                    .child(Element::host("span", Props::new().child(trailing.to_string()))),
            )
        };

        harness.render(list("a")).unwrap();
        counter_setter().update(|n| n + 1);

        // Changing an unrelated sibling re-renders the unit in place; its
        // cell value is preserved.
        harness.render(list("b")).unwrap();
        let ul = harness.top_host_child().unwrap();
        harness.with_host(|host| {
            let li = host.child_ids(ul)[0];
            let text = host.child_ids(li)[0];
            assert_eq!(host.text(text), Some("row:101"));
        });
    });
}

#[test]
fn click_handler_dispatch_drives_a_full_pass() {
    fn clicky(scope: &mut Scope, _props: &Props) -> Result<Element, RenderError> {
        let (count, set_count) = scope.use_state(|| 0i64)?;
        let handler = {
            let set_count = SetState::clone(&set_count);
            Rc::new(move |_event: &reweave_core::SyntheticEvent| {
                set_count.update(|n| n + 1);
            })
        };
        Ok(Element::host(
            "button",
            Props::new()
                .on("onClick", handler)
                .child(format!("clicked {count}")),
        ))
    }

    run_render_test(|harness| {
        harness.render(Element::component(clicky)).unwrap();
        let button = harness.top_host_child().unwrap();

        harness.click(button);
        harness.click(button);

        let button = harness.top_host_child().unwrap();
        harness.with_host(|host| {
            let text = host.child_ids(button)[0];
            assert_eq!(host.text(text), Some("clicked 2"));
        });
    });
}
