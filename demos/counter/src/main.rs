//! # Counter Demo
//!
//! A view-model backed by a store, driven from several threads while a
//! "view" task renders two projections of its state.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;
use viewstate_core::{Dispatcher, Store, ThreadDispatcher, ViewModel};

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
struct CounterState {
    element_count: u32,
}

impl CounterState {
    fn should_show_banner(&self) -> bool {
        self.element_count == 0
    }
}

// ============================================================================
// View-model
// ============================================================================

struct CounterViewModel {
    store: Store<CounterState>,
}

impl CounterViewModel {
    fn new(dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        let store = Store::builder(CounterState::default())
            .name("counter")
            .shared_dispatcher(dispatcher)
            .build()?;
        Ok(Self { store })
    }

    fn increase_count(&self, by: u32) {
        self.store.update(move |s| s.element_count += by);
    }

    /// Clears the counter, but only if it reached `limit` by the time the
    /// request is processed.
    fn reset_if_at_least(&self, limit: u32) {
        let store = self.store.clone();
        self.store.get(move |state| {
            if state.element_count >= limit {
                tracing::info!(count = state.element_count, "limit reached, resetting");
                store.set(|_| CounterState::default());
            }
        });
    }
}

impl ViewModel for CounterViewModel {
    type State = CounterState;

    fn store(&self) -> &Store<CounterState> {
        &self.store
    }
}

impl Drop for CounterViewModel {
    fn drop(&mut self) {
        self.store.dispose();
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let ui: Arc<dyn Dispatcher> = Arc::new(ThreadDispatcher::spawn("ui")?);
    let vm = Arc::new(CounterViewModel::new(ui)?);

    let mut banner = vm.state_of(|s| s.should_show_banner());
    let mut counts = vm.state_of(|s| s.element_count);

    let view = tokio::spawn(async move {
        let mut renders = 0;
        while let Some(count) = counts.next().await {
            renders += 1;
            println!("count: {count}");
        }
        renders
    });
    let banner_view = tokio::spawn(async move {
        while let Some(show) = banner.next().await {
            println!("banner visible: {show}");
        }
    });

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let vm = vm.clone();
            tokio::task::spawn_blocking(move || {
                for _ in 0..25 {
                    vm.increase_count(1);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.context("producer task panicked")?;
    }

    let state = vm.store().snapshot().await?;
    println!("after producers: {}", state.element_count);

    vm.reset_if_at_least(100);
    let state = vm.store().snapshot().await?;
    println!("after reset: {}", state.element_count);

    println!("{}", serde_json::to_string_pretty(&vm.store().stats())?);

    vm.store().dispose();
    let renders = view.await?;
    banner_view.await?;
    tracing::info!(renders, "view finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewstate_core::ManualDispatcher;
    use viewstate_testing::ready_items;

    fn manual_vm() -> (CounterViewModel, ManualDispatcher) {
        let dispatcher = ManualDispatcher::new();
        let vm = CounterViewModel::new(Arc::new(dispatcher.clone())).unwrap();
        (vm, dispatcher)
    }

    #[test]
    fn element_count_after_increase() {
        let (vm, dispatcher) = manual_vm();
        let mut count = vm.state_of(|s| s.element_count);
        vm.increase_count(1);
        dispatcher.run_until_idle();

        assert_eq!(ready_items(&mut count).last(), Some(&1));
    }

    #[test]
    fn banner_shown_initially() {
        let (vm, _dispatcher) = manual_vm();
        let mut banner = vm.state_of(|s| s.should_show_banner());
        assert_eq!(ready_items(&mut banner), vec![true]);
    }

    #[test]
    fn banner_hidden_after_increase() {
        let (vm, dispatcher) = manual_vm();
        vm.increase_count(10);
        dispatcher.run_until_idle();

        let mut banner = vm.state_of(|s| s.should_show_banner());
        assert_eq!(ready_items(&mut banner), vec![false]);
    }

    #[test]
    fn reset_applies_before_later_reads() {
        let (vm, dispatcher) = manual_vm();
        vm.increase_count(5);
        vm.reset_if_at_least(5);
        let (tx, rx) = std::sync::mpsc::channel();
        vm.store().get(move |state| tx.send(state.element_count).unwrap());
        dispatcher.run_until_idle();

        assert_eq!(rx.try_recv().ok(), Some(0));
    }

    #[test]
    fn dropping_the_view_model_disposes_the_store() {
        let (vm, _dispatcher) = manual_vm();
        let store = vm.store().clone();
        drop(vm);
        assert!(store.is_disposed());
    }
}
