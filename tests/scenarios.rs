use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use zurto::{CONFIG_KEY, Callback, GlobalStore, Listeners, State};

fn recorder<T: Clone + 'static>() -> (Callback<T>, Rc<RefCell<Vec<T>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let callback = Callback::new(move |value: &T| sink.borrow_mut().push(value.clone()));
    (callback, seen)
}

#[test]
fn null_initialised_cell_lifecycle() {
    let cell: State<Option<String>> = State::default();
    let (cb, seen) = recorder();

    let detach = cell.subscribe(&cb);
    assert_eq!(*seen.borrow(), vec![None]);

    cell.set(Some("x".to_string()));
    assert_eq!(*seen.borrow(), vec![None, Some("x".to_string())]);

    detach.detach();
    cell.set(Some("y".to_string()));
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn catch_up_before_any_set() {
    let cell = State::new(5);
    let (cb, seen) = recorder();
    cell.subscribe(&cb);
    assert_eq!(*seen.borrow(), vec![5]);
}

#[test]
fn uninvoked_unsubscribe_keeps_callback() {
    let cell = State::new(0);
    let (cb, seen) = recorder();
    cell.subscribe(&cb);

    let _never_called = cell.unsubscribe(&cb);
    cell.set(1);
    cell.set(2);
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    assert_eq!(cell.subscriber_count(), 1);
}

#[test]
fn store_init_set_remove() {
    let mut store = GlobalStore::new();
    store.init();
    assert_eq!(store.get(CONFIG_KEY), Some(&json!({})));

    store.set("a", json!(1));
    assert_eq!(store.get("a"), Some(&json!(1)));

    store.remove("a");
    assert_eq!(store.get("a"), None);
}

#[test]
fn aggregator_remove_stops_callback() {
    let c1 = State::new(0);
    let c2 = State::new(0);
    let (f, seen) = recorder();
    let mut listeners = Listeners::new(f, [&c1, &c2]);
    seen.borrow_mut().clear();

    c1.set(10);
    assert_eq!(*seen.borrow(), vec![10]);

    listeners.remove(&c1);
    c1.set(20);
    assert_eq!(*seen.borrow(), vec![10]);
}

#[test]
fn aggregator_unsubscribe_then_add_resubscribes() {
    let a = State::new(1);
    let (f, seen) = recorder();
    let mut listeners = Listeners::new(f, [&a]);
    listeners.unsubscribe();
    a.set(2);
    assert_eq!(*seen.borrow(), vec![1]);

    // the tracked list still holds `a`, so adding it again tracks it twice
    listeners.add(&a);
    assert_eq!(listeners.len(), 2);
    a.set(3);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[test]
fn cells_share_callback_between_listeners_and_direct_subscription() {
    let cell = State::new(0);
    let (f, seen) = recorder();
    let direct = cell.subscribe(&f);
    let mut listeners = Listeners::new(f.clone(), [&cell]);
    assert_eq!(cell.subscriber_count(), 2);

    // identity removal also drops the direct entry
    listeners.remove(&cell);
    assert_eq!(cell.subscriber_count(), 0);
    cell.set(9);
    assert_eq!(*seen.borrow(), vec![0, 0]);
    direct.detach();
}
