//! Counter state surviving a simulated host recreation.
//!
//! Composes a small "screen", mutates its remembered state, then has the
//! host save, tear the composition down, and compose it afresh — every
//! `remember_saveable` call site comes back with its persisted value.

#![allow(non_snake_case)]

use std::cell::RefCell;
use std::rc::Rc;

use retain_core::Signal;
use retain_saveable::{
    MemoryStore, RestorationHost, remember_saveable, remember_saveable_keyed,
    remember_saveable_with, saver,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Draft {
    title: String,
    body: String,
}

#[derive(Clone, Debug, PartialEq)]
enum Tab {
    Counter,
    Editor,
}

/// Strategy for a type serde has no derive for here: store the tab as its
/// name.
fn tab_saver() -> impl retain_saveable::Saver<Tab> {
    saver(
        |tab: &Tab| match tab {
            Tab::Counter => json!("counter"),
            Tab::Editor => json!("editor"),
        },
        |saved| match saved.as_str() {
            Some("counter") => Some(Tab::Counter),
            Some("editor") => Some(Tab::Editor),
            _ => None,
        },
    )
}

#[derive(Clone, Default)]
struct ScreenHandles {
    count: Rc<RefCell<Option<Rc<Signal<i64>>>>>,
    draft: Rc<RefCell<Option<Rc<Signal<Draft>>>>>,
    tab: Rc<RefCell<Option<Rc<Signal<Tab>>>>>,
}

fn CounterScreen(handles: &ScreenHandles) {
    let count = remember_saveable(|| 0i64);
    let draft = remember_saveable_keyed("draft", || Draft {
        title: String::from("untitled"),
        body: String::new(),
    });
    let tab = remember_saveable_with(Some("tab"), tab_saver(), || Tab::Counter);

    // Read during the pass so writes invalidate the composition.
    let count_now = count.get();
    let title_now = draft.with(|d| d.title.clone());
    let tab_now = tab.get();
    log::info!("composed: count={count_now} title='{title_now}' tab={tab_now:?}");

    *handles.count.borrow_mut() = Some(count);
    *handles.draft.borrow_mut() = Some(draft);
    *handles.tab.borrow_mut() = Some(tab);
}

fn main() {
    env_logger::init();

    let mut host = RestorationHost::new(MemoryStore::new());
    let handles = ScreenHandles::default();

    let h = handles.clone();
    host.compose(move || CounterScreen(&h));

    // Simulated interaction.
    for _ in 0..3 {
        handles.count.borrow().as_ref().unwrap().update(|v| *v += 1);
    }
    handles.draft.borrow().as_ref().unwrap().update(|d| {
        d.title = "trip notes".into();
        d.body = "pack the charger".into();
    });
    handles.tab.borrow().as_ref().unwrap().set(Tab::Editor);
    host.recompose_if_invalidated();

    println!("before recreation:");
    println!("  count = {}", handles.count.borrow().as_ref().unwrap().get());
    println!(
        "  draft = {:?}",
        handles.draft.borrow().as_ref().unwrap().get()
    );
    println!("  tab   = {:?}", handles.tab.borrow().as_ref().unwrap().get());

    // The platform takes the UI away and brings it back.
    if let Err(err) = host.recreate() {
        log::error!("save failed: {err}");
        return;
    }

    println!("after recreation:");
    println!("  count = {}", handles.count.borrow().as_ref().unwrap().get());
    println!(
        "  draft = {:?}",
        handles.draft.borrow().as_ref().unwrap().get()
    );
    println!("  tab   = {:?}", handles.tab.borrow().as_ref().unwrap().get());
    println!("saved keys: {:?}", host.store().snapshot().keys().collect::<Vec<_>>());
}
