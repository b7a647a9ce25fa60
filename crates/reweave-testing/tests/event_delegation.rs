//! Capture/bubble replay over trees committed by the runtime.

use std::cell::RefCell;
use std::rc::Rc;

use reweave_core::{Element, EventHandler, Props, SyntheticEvent};
use reweave_testing::RenderTest;

type CallLog = Rc<RefCell<Vec<&'static str>>>;

fn logging(log: &CallLog, label: &'static str, stop: bool) -> EventHandler {
    let log = Rc::clone(log);
    Rc::new(move |event: &SyntheticEvent| {
        log.borrow_mut().push(label);
        if stop {
            event.stop_propagation();
        }
    })
}

/// div > section > button, all three ancestors carrying both phases.
fn nested_tree(log: &CallLog, stop_at: Option<&'static str>) -> Element {
    let stops = |label: &str| stop_at == Some(label);
    Element::host(
        "div",
        Props::new()
            .on_click_capture(logging(log, "capture div", stops("capture div")))
            .on_click(logging(log, "bubble div", stops("bubble div")))
            .child(
                Element::host(
                    "section",
                    Props::new()
                        .on_click_capture(logging(log, "capture section", stops("capture section")))
                        .on_click(logging(log, "bubble section", stops("bubble section")))
                        .child(
                            Element::host(
                                "button",
                                Props::new()
                                    .on_click_capture(logging(
                                        log,
                                        "capture button",
                                        stops("capture button"),
                                    ))
                                    .on_click(logging(log, "bubble button", stops("bubble button")))
                                    .child("press"),
                            ),
                        ),
                ),
            ),
    )
}

fn button_of(harness: &RenderTest) -> reweave_core::HostId {
    let div = harness.top_host_child().unwrap();
    harness.with_host(|host| {
        let section = host.child_ids(div)[0];
        host.child_ids(section)[0]
    })
}

#[test]
fn click_replays_capture_top_down_then_bubble_bottom_up() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut harness = RenderTest::new();
    harness.render(nested_tree(&log, None)).unwrap();

    harness.click(button_of(&harness));
    assert_eq!(
        *log.borrow(),
        vec![
            "capture div",
            "capture section",
            "capture button",
            "bubble button",
            "bubble section",
            "bubble div",
        ]
    );
}

#[test]
fn capture_stop_suppresses_every_bubble_callback() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut harness = RenderTest::new();
    harness
        .render(nested_tree(&log, Some("capture section")))
        .unwrap();

    harness.click(button_of(&harness));
    assert_eq!(*log.borrow(), vec!["capture div", "capture section"]);
}

#[test]
fn clicking_an_inner_text_target_walks_from_its_element() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut harness = RenderTest::new();
    harness.render(nested_tree(&log, None)).unwrap();

    // The text node itself carries no props bag; the walk starts at it and
    // picks up every ancestor's handlers on the way to the container.
    let text = harness.with_host(|host| host.child_ids(button_of(&harness))[0]);
    harness.click(text);
    assert_eq!(log.borrow().len(), 6);
}

#[test]
fn handlers_attached_after_an_update_pass_are_live() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut harness = RenderTest::new();

    // First pass: no handlers at all.
    harness
        .render(Element::host("div", Props::new().child("quiet")))
        .unwrap();
    harness.click(harness.top_host_child().unwrap());
    assert!(log.borrow().is_empty());

    // Second pass: the same element gains a bubble handler; the update
    // commit refreshes the props bag the delegation layer reads.
    harness
        .render(Element::host(
            "div",
            Props::new()
                .on_click(logging(&log, "bubble div", false))
                .child("loud"),
        ))
        .unwrap();
    harness.click(harness.top_host_child().unwrap());
    assert_eq!(*log.borrow(), vec!["bubble div"]);
}
