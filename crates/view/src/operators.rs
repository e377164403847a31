//! Stream operators for control values
//!
//! Each operator is an async fn that pumps from an input to an unbounded
//! output channel and returns once either end closes. Callers spawn them on
//! the worker context and chain them with channels.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

/// Forward every change of a watch cell. The value present at subscription is skipped.
pub async fn changes<T>(mut source: watch::Receiver<T>, output: mpsc::UnboundedSender<T>)
where
    T: Clone + Send + Sync,
{
    while source.changed().await.is_ok() {
        let value = source.borrow_and_update().clone();
        if output.send(value).is_err() {
            break;
        }
    }
}

/// Emit the latest pair whenever either cell changes
pub async fn combine_latest<A, B>(
    mut a: watch::Receiver<A>,
    mut b: watch::Receiver<B>,
    output: mpsc::UnboundedSender<(A, B)>,
) where
    A: Clone + Send + Sync,
    B: Clone + Send + Sync,
{
    loop {
        tokio::select! {
            changed = a.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = b.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let pair = (a.borrow_and_update().clone(), b.borrow_and_update().clone());
        if output.send(pair).is_err() {
            break;
        }
    }
}

/// Emit a value only after `quiet` has passed with no newer value.
///
/// A pending value is flushed when the input closes.
pub async fn debounce<T: Send>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
    quiet: Duration,
) {
    while let Some(first) = input.recv().await {
        let mut pending = first;
        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => pending = value,
                    None => {
                        let _ = output.send(pending);
                        return;
                    }
                },
                _ = tokio::time::sleep(quiet) => break,
            }
        }
        if output.send(pending).is_err() {
            return;
        }
    }
}

/// At each `period` boundary emit the latest value seen since the last boundary
pub async fn sample<T: Send>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut latest = None;

    loop {
        tokio::select! {
            next = input.recv() => match next {
                Some(value) => latest = Some(value),
                None => break,
            },
            _ = ticker.tick() => {
                if let Some(value) = latest.take() {
                    if output.send(value).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Drop values equal to the one emitted just before
pub async fn distinct_until_changed<T>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) where
    T: Clone + PartialEq + Send,
{
    let mut last: Option<T> = None;
    while let Some(value) = input.recv().await {
        if last.as_ref() == Some(&value) {
            continue;
        }
        last = Some(value.clone());
        if output.send(value).is_err() {
            break;
        }
    }
}
