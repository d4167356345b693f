//! Suppression of stale fetch results.
//!
//! Every request is issued a [Ticket] from a shared [Generations] counter. Issuing a new ticket
//! supersedes all earlier ones, so when an older request finally resolves its result is discarded
//! instead of overwriting the state produced for a newer selection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Default)]
pub struct Generations {
    current: Arc<AtomicU64>,
}
impl Generations {
    /// Issues a ticket for a new request, superseding every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued ticket, if any.
    pub fn newest(&self) -> Option<Ticket> {
        match self.current.load(Ordering::Acquire) {
            0 => None,
            current => Some(Ticket(current)),
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }

    /// Passes `value` through only if `ticket` has not been superseded.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!("discarding stale result for {ticket:?}");
            None
        }
    }
}

/// A slot holding the result of the newest request. Results of superseded requests never land.
#[derive(Debug)]
pub struct Latest<T> {
    generations: Generations,
    slot: Arc<Mutex<Slot<T>>>,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    settled: Option<Ticket>,
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self {
            generations: Generations::default(),
            slot: Arc::new(Mutex::new(Slot {
                value: None,
                settled: None,
            })),
        }
    }

    pub fn issue(&self) -> Ticket {
        self.generations.issue()
    }

    /// Stores `value` if `ticket` is still the newest; returns whether it was stored.
    pub fn offer(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.lock();
        // checked under the lock so two offers can't interleave between check and store
        match self.generations.accept(ticket, value) {
            Some(value) => {
                slot.value = Some(value);
                slot.settled = Some(ticket);
                true
            }
            None => false,
        }
    }

    /// Whether the newest ticket is still awaiting its result. Issuing another ticket meanwhile
    /// would discard that result when it lands.
    pub fn is_pending(&self) -> bool {
        let slot = self.lock();
        let newest = self.generations.newest();
        newest.is_some() && slot.settled != newest
    }

    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> Latest<T> {
    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }
}

// clones share the slot, so `T` itself needn't be `Clone`
impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            generations: self.generations.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn newer_ticket_supersedes() {
        let generations = Generations::default();
        let first = generations.issue();
        assert!(generations.is_current(first));
        let second = generations.issue();
        assert!(second > first);
        assert!(!generations.is_current(first));
        assert_eq!(None, generations.accept(first, "stale"));
        assert_eq!(Some("fresh"), generations.accept(second, "fresh"));
    }

    #[test]
    fn clones_share_the_counter() {
        let generations = Generations::default();
        let ticket = generations.issue();
        generations.clone().issue();
        assert!(!generations.is_current(ticket));
    }

    #[test]
    fn latest_ignores_out_of_order_results() {
        let latest = Latest::new();
        let slow = latest.issue();
        let fast = latest.issue();
        assert!(latest.offer(fast, "race 2"));
        assert!(!latest.offer(slow, "race 1"));
        assert_eq!(Some("race 2"), latest.get());
        assert_eq!(Some("race 2"), latest.take());
        assert_eq!(None, latest.get());
    }

    #[test]
    fn pending_until_newest_ticket_lands() {
        let latest = Latest::new();
        assert!(!latest.is_pending());

        let first = latest.issue();
        assert!(latest.is_pending());
        assert!(latest.offer(first, "race 1"));
        assert!(!latest.is_pending());

        // a stale offer doesn't settle the newer ticket
        let second = latest.issue();
        assert!(!latest.offer(first, "race 1 again"));
        assert!(latest.is_pending());
        assert!(latest.offer(second, "race 2"));
        assert!(!latest.is_pending());

        // taking the value leaves the ticket settled
        assert_eq!(Some("race 2"), latest.take());
        assert!(!latest.is_pending());
    }

    #[tokio::test]
    async fn slow_fetch_lands_when_not_superseded() {
        let latest: Latest<u32> = Latest::default();
        let mut landed = vec![];
        for round in 0..3 {
            if !latest.is_pending() {
                let ticket = latest.issue();
                let latest = latest.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    latest.offer(ticket, round)
                });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            landed.extend(latest.take());
        }
        while latest.is_pending() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        landed.extend(latest.take());
        assert_eq!(vec![0], landed);
    }

    #[tokio::test]
    async fn late_task_cannot_overwrite() {
        let latest: Latest<u32> = Latest::default();

        let slow_ticket = latest.issue();
        let slow = {
            let latest = latest.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                latest.offer(slow_ticket, 1)
            })
        };

        let fast_ticket = latest.issue();
        let fast = {
            let latest = latest.clone();
            tokio::spawn(async move { latest.offer(fast_ticket, 2) })
        };

        assert!(fast.await.unwrap());
        assert!(!slow.await.unwrap());
        assert_eq!(Some(2), latest.get());
    }
}
