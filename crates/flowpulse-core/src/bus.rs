//! In-process publish/subscribe bus
//!
//! Decouples the simulation layer (producer) from the pulse scheduler
//! (consumer). Each event kind keeps an independent subscriber list; a
//! publish runs every subscribed handler synchronously, in registration
//! order, at most once.
//!
//! Subscriber lists are replaced on write. A publish iterates the list as it
//! was when the publish began, so a handler may subscribe or unsubscribe
//! (itself or others) while it runs:
//! - handlers unsubscribed earlier in the same pass are skipped
//! - handlers subscribed during the pass first see the next publish

use crate::{AnchorId, PulseOptions};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// The independent channels carried by the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Transient edge highlight
    Flash,
    /// Burst of pulses along an edge
    Pulse,
}

/// Request to highlight the edge `from -> to` for the decay window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashEvent {
    pub from: AnchorId,
    pub to: AnchorId,
}

impl FlashEvent {
    pub fn new(from: impl Into<AnchorId>, to: impl Into<AnchorId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Request to send a pulse train along `from -> to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    pub from: AnchorId,
    pub to: AnchorId,
    #[serde(flatten)]
    pub options: PulseOptions,
}

impl PulseEvent {
    pub fn new(from: impl Into<AnchorId>, to: impl Into<AnchorId>, options: PulseOptions) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            options,
        }
    }
}

/// A payload type with its own channel on the bus
pub trait BusEvent: Sized + 'static {
    /// Channel this payload travels on
    const KIND: EventKind;

    #[doc(hidden)]
    fn channel(channels: &Channels) -> &Channel<Self>;
}

impl BusEvent for FlashEvent {
    const KIND: EventKind = EventKind::Flash;

    fn channel(channels: &Channels) -> &Channel<Self> {
        &channels.flash
    }
}

impl BusEvent for PulseEvent {
    const KIND: EventKind = EventKind::Pulse;

    fn channel(channels: &Channels) -> &Channel<Self> {
        &channels.pulse
    }
}

struct Entry<T> {
    id: u64,
    active: Cell<bool>,
    handler: Box<dyn Fn(&T)>,
}

/// Subscriber list for one event kind
#[doc(hidden)]
pub struct Channel<T> {
    entries: RefCell<Rc<[Rc<Entry<T>>]>>,
}

impl<T> Channel<T> {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Rc::from(Vec::new())),
        }
    }

    fn add(&self, entry: Entry<T>) {
        let mut entries = self.entries.borrow_mut();
        let mut next: Vec<Rc<Entry<T>>> = entries.to_vec();
        next.push(Rc::new(entry));
        *entries = Rc::from(next);
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.iter().find(|e| e.id == id) else {
            return false;
        };
        entry.active.set(false);
        let next: Vec<Rc<Entry<T>>> = entries.iter().filter(|e| e.id != id).cloned().collect();
        *entries = Rc::from(next);
        true
    }

    fn snapshot(&self) -> Rc<[Rc<Entry<T>>]> {
        Rc::clone(&self.entries.borrow())
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// All channels of one bus
#[doc(hidden)]
pub struct Channels {
    flash: Channel<FlashEvent>,
    pulse: Channel<PulseEvent>,
}

struct BusInner {
    channels: Channels,
    next_id: Cell<u64>,
}

impl BusInner {
    fn remove(&self, kind: EventKind, id: u64) -> bool {
        match kind {
            EventKind::Flash => self.channels.flash.remove(id),
            EventKind::Pulse => self.channels.pulse.remove(id),
        }
    }
}

/// Handle to an event bus; clones share the same subscriber lists
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                channels: Channels {
                    flash: Channel::new(),
                    pulse: Channel::new(),
                },
                next_id: Cell::new(0),
            }),
        }
    }

    /// Register `handler` for every future event of kind `E`
    pub fn subscribe<E: BusEvent>(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        E::channel(&self.inner.channels).add(Entry {
            id,
            active: Cell::new(true),
            handler: Box::new(handler),
        });
        trace!(kind = ?E::KIND, id, "bus subscription added");

        Subscription {
            bus: Rc::downgrade(&self.inner),
            kind: E::KIND,
            id,
            live: true,
        }
    }

    /// Deliver `event` to every handler subscribed to its kind
    ///
    /// Returns the number of handlers invoked.
    pub fn publish<E: BusEvent>(&self, event: &E) -> usize {
        let snapshot = E::channel(&self.inner.channels).snapshot();
        let mut delivered = 0;
        for entry in snapshot.iter() {
            if entry.active.get() {
                (entry.handler)(event);
                delivered += 1;
            }
        }
        trace!(kind = ?E::KIND, delivered, "bus event published");
        delivered
    }

    /// Number of handlers currently subscribed to `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Flash => self.inner.channels.flash.len(),
            EventKind::Pulse => self.inner.channels.pulse.len(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("flash", &self.subscriber_count(EventKind::Flash))
            .field("pulse", &self.subscriber_count(EventKind::Pulse))
            .finish()
    }
}

/// A registered handler
///
/// Dropping the subscription unsubscribes the handler. Unsubscribing twice,
/// or after the bus is gone, is a no-op.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusInner>,
    kind: EventKind,
    id: u64,
    live: bool,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler from the bus
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the handler registered for the lifetime of the bus
    pub fn detach(mut self) {
        self.live = false;
    }

    fn release(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(self.kind, self.id) {
                trace!(kind = ?self.kind, id = self.id, "bus subscription removed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Producer-side facade used by the simulation layer
#[derive(Debug, Clone)]
pub struct FlowEmitter {
    bus: EventBus,
}

impl FlowEmitter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Ask for a pulse train along `from -> to`
    pub fn request_pulse(
        &self,
        from: impl Into<AnchorId>,
        to: impl Into<AnchorId>,
        options: PulseOptions,
    ) -> usize {
        self.bus.publish(&PulseEvent::new(from, to, options))
    }

    /// Ask for a transient highlight of the edge `from -> to`
    pub fn request_flash(&self, from: impl Into<AnchorId>, to: impl Into<AnchorId>) -> usize {
        self.bus.publish(&FlashEvent::new(from, to))
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut subs = Vec::new();
        for n in 0..3 {
            let log = Rc::clone(&log);
            subs.push(bus.subscribe(move |e: &FlashEvent| {
                log.borrow_mut().push((n, e.from.to_string()));
            }));
        }

        assert_eq!(bus.publish(&FlashEvent::new("A", "B")), 3);
        assert_eq!(
            *log.borrow(),
            vec![(0, "A".to_string()), (1, "A".to_string()), (2, "A".to_string())]
        );
    }

    #[test]
    fn test_kinds_are_independent() {
        let bus = EventBus::new();
        let flashes = Rc::new(Cell::new(0));
        let pulses = Rc::new(Cell::new(0));

        let f = Rc::clone(&flashes);
        let _a = bus.subscribe(move |_: &FlashEvent| f.set(f.get() + 1));
        let p = Rc::clone(&pulses);
        let _b = bus.subscribe(move |_: &PulseEvent| p.set(p.get() + 1));

        bus.publish(&PulseEvent::new("A", "B", PulseOptions::default()));
        assert_eq!(flashes.get(), 0);
        assert_eq!(pulses.get(), 1);
        assert_eq!(bus.subscriber_count(EventKind::Flash), 1);
        assert_eq!(bus.subscriber_count(EventKind::Pulse), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = bus.subscribe(move |_: &FlashEvent| h.set(h.get() + 1));

        bus.publish(&FlashEvent::new("A", "B"));
        drop(sub);
        bus.publish(&FlashEvent::new("A", "B"));

        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(EventKind::Flash), 0);
    }

    #[test]
    fn test_detach_keeps_handler() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        bus.subscribe(move |_: &FlashEvent| h.set(h.get() + 1)).detach();

        bus.publish(&FlashEvent::new("A", "B"));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(EventKind::Flash), 1);
    }

    #[test]
    fn test_unsubscribe_self_during_publish() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        let _first = bus.subscribe(move |_: &FlashEvent| l.borrow_mut().push("first"));

        let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let own_handle = Rc::clone(&own);
        let l = Rc::clone(&log);
        let once = bus.subscribe(move |_: &FlashEvent| {
            l.borrow_mut().push("once");
            if let Some(sub) = own_handle.borrow_mut().take() {
                sub.unsubscribe();
            }
        });
        *own.borrow_mut() = Some(once);

        let l = Rc::clone(&log);
        let _last = bus.subscribe(move |_: &FlashEvent| l.borrow_mut().push("last"));

        assert_eq!(bus.publish(&FlashEvent::new("A", "B")), 3);
        assert_eq!(*log.borrow(), vec!["first", "once", "last"]);

        log.borrow_mut().clear();
        assert_eq!(bus.publish(&FlashEvent::new("A", "B")), 2);
        assert_eq!(*log.borrow(), vec!["first", "last"]);
    }

    #[test]
    fn test_unsubscribed_earlier_in_pass_is_skipped() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let v = Rc::clone(&victim);
        let _killer = bus.subscribe(move |_: &FlashEvent| {
            v.borrow_mut().take();
        });
        let h = Rc::clone(&hits);
        *victim.borrow_mut() = Some(bus.subscribe(move |_: &FlashEvent| h.set(h.get() + 1)));

        assert_eq!(bus.publish(&FlashEvent::new("A", "B")), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_subscribe_during_publish_waits_for_next() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let added: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        let h = Rc::clone(&hits);
        let a = Rc::clone(&added);
        let _adder = bus.subscribe(move |_: &FlashEvent| {
            let h = Rc::clone(&h);
            a.borrow_mut()
                .push(inner_bus.subscribe(move |_: &FlashEvent| h.set(h.get() + 1)));
        });

        bus.publish(&FlashEvent::new("A", "B"));
        assert_eq!(hits.get(), 0);
        bus.publish(&FlashEvent::new("A", "B"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_emitter_publishes() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let _sub = bus.subscribe(move |e: &PulseEvent| *s.borrow_mut() = Some(e.clone()));

        let emitter = FlowEmitter::new(bus.clone());
        assert_eq!(
            emitter.request_pulse("SUP", "WH", PulseOptions::default().count(3)),
            1
        );
        assert_eq!(emitter.request_flash("SUP", "WH"), 0);

        let event = seen.borrow().clone().unwrap();
        assert_eq!(event.from, "SUP");
        assert_eq!(event.options.count, Some(3));
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_: &FlashEvent| {});
        drop(bus);
        sub.unsubscribe();
    }
}
