use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use repose_core::{Dispose, disposable_effect_with, remember_latest};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ListenerOptions: u8 {
        /// Dispatched before every non-capture listener.
        const CAPTURE = 1 << 0;
        /// Removed after its first dispatch.
        const ONCE = 1 << 1;
        /// Promises not to react synchronously to the event; see
        /// [`EventBus::has_active_listeners`].
        const PASSIVE = 1 << 2;
    }
}

pub type Listener<E> = Rc<dyn Fn(&E)>;

/// Something named events can be listened to on.
pub trait EventTarget<E> {
    /// Register `listener` for `name`. Running the returned disposer removes it.
    fn listen(&self, name: &str, options: ListenerOptions, listener: Listener<E>) -> Dispose;
}

new_key_type! {
    pub struct ListenerId;
}

struct Entry<E> {
    name: String,
    options: ListenerOptions,
    seq: u64,
    listener: Listener<E>,
}

struct Registry<E> {
    entries: RefCell<SlotMap<ListenerId, Entry<E>>>,
    next_seq: Cell<u64>,
}

/// In-process [`EventTarget`]. Clones share the same listeners.
pub struct EventBus<E: 'static> {
    registry: Rc<Registry<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                entries: RefCell::new(SlotMap::with_key()),
                next_seq: Cell::new(0),
            }),
        }
    }

    /// Calls every listener for `name` and returns how many were called.
    /// Capture listeners go first, otherwise registration order is kept.
    pub fn dispatch(&self, name: &str, event: &E) -> usize {
        let mut due: SmallVec<[(bool, u64, Listener<E>); 8]> = SmallVec::new();
        {
            let mut entries = self.registry.entries.borrow_mut();
            let mut spent: SmallVec<[ListenerId; 4]> = SmallVec::new();
            for (id, e) in entries.iter().filter(|(_, e)| e.name == name) {
                due.push((
                    !e.options.contains(ListenerOptions::CAPTURE),
                    e.seq,
                    e.listener.clone(),
                ));
                if e.options.contains(ListenerOptions::ONCE) {
                    spent.push(id);
                }
            }
            for id in spent {
                entries.remove(id);
            }
        }
        due.sort_by_key(|(bubble, seq, _)| (*bubble, *seq));
        log::trace!("event bus: '{name}' to {} listener(s)", due.len());
        for (_, _, listener) in &due {
            listener(event);
        }
        due.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.registry
            .entries
            .borrow()
            .values()
            .filter(|e| e.name == name)
            .count()
    }

    /// Whether any listener for `name` is not passive.
    pub fn has_active_listeners(&self, name: &str) -> bool {
        self.registry
            .entries
            .borrow()
            .values()
            .any(|e| e.name == name && !e.options.contains(ListenerOptions::PASSIVE))
    }
}

impl<E: 'static> EventTarget<E> for EventBus<E> {
    fn listen(&self, name: &str, options: ListenerOptions, listener: Listener<E>) -> Dispose {
        let seq = self.registry.next_seq.get();
        self.registry.next_seq.set(seq + 1);
        let id = self.registry.entries.borrow_mut().insert(Entry {
            name: name.to_owned(),
            options,
            seq,
            listener,
        });
        let registry: Weak<Registry<E>> = Rc::downgrade(&self.registry);
        Dispose::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.entries.borrow_mut().remove(id);
            }
        })
    }
}

/// Listen to `name` on `target` for as long as the component lives.
///
/// Re-subscribes only when the target (by identity), the name or the options
/// change; in between, dispatches always reach the listeners of the latest
/// pass.
pub fn use_event_listener<T, E>(
    target: &Rc<T>,
    name: &str,
    options: ListenerOptions,
    listeners: Vec<Listener<E>>,
) where
    T: EventTarget<E> + ?Sized + 'static,
    E: 'static,
{
    let latest = remember_latest(listeners);
    disposable_effect_with(
        (target.clone(), name.to_owned(), options),
        |(pt, pn, po), (nt, nn, no)| Rc::ptr_eq(pt, nt) && pn == nn && po == no,
        {
            let target = target.clone();
            let name = name.to_owned();
            move || {
                log::debug!("event listener: subscribing to '{name}' ({options:?})");
                target.listen(
                    &name,
                    options,
                    Rc::new(move |event: &E| {
                        let current = latest.get().unwrap_or_default();
                        for l in &current {
                            l(event);
                        }
                    }),
                )
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use repose_core::Composition;

    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Listener<u32> {
        let log = log.clone();
        Rc::new(move |e: &u32| log.borrow_mut().push(format!("{tag}:{e}")))
    }

    #[test]
    fn capture_first_then_registration_order() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = bus.listen("click", ListenerOptions::empty(), recorder(&log, "a"));
        let _b = bus.listen("click", ListenerOptions::CAPTURE, recorder(&log, "b"));
        let _c = bus.listen("click", ListenerOptions::empty(), recorder(&log, "c"));
        let _other = bus.listen("key", ListenerOptions::empty(), recorder(&log, "x"));

        assert_eq!(bus.dispatch("click", &1), 3);
        assert_eq!(*log.borrow(), vec!["b:1", "a:1", "c:1"]);
    }

    #[test]
    fn once_listener_is_removed_after_first_dispatch() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _once = bus.listen("click", ListenerOptions::ONCE, recorder(&log, "once"));
        assert_eq!(bus.listener_count("click"), 1);

        bus.dispatch("click", &1);
        bus.dispatch("click", &2);
        assert_eq!(*log.borrow(), vec!["once:1"]);
        assert_eq!(bus.listener_count("click"), 0);
    }

    #[test]
    fn passive_listeners_are_not_active() {
        let bus = EventBus::<u32>::new();
        let passive = bus.listen("scroll", ListenerOptions::PASSIVE, Rc::new(|_: &u32| {}));
        assert!(!bus.has_active_listeners("scroll"));
        let active = bus.listen("scroll", ListenerOptions::empty(), Rc::new(|_: &u32| {}));
        assert!(bus.has_active_listeners("scroll"));
        active.run();
        passive.run();
        assert_eq!(bus.listener_count("scroll"), 0);
    }

    #[test]
    fn hook_keeps_subscription_and_uses_latest_listeners() {
        let bus = Rc::new(EventBus::<u32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        let body = |tag: &'static str| {
            let listeners = vec![recorder(&log, tag)];
            let bus = bus.clone();
            move || use_event_listener(&bus, "click", ListenerOptions::empty(), listeners)
        };

        comp.compose(body("first"));
        bus.dispatch("click", &1);
        comp.compose(body("second"));
        bus.dispatch("click", &2);
        assert_eq!(bus.listener_count("click"), 1);
        assert_eq!(*log.borrow(), vec!["first:1", "second:2"]);

        comp.dispose();
        assert_eq!(bus.dispatch("click", &3), 0);
    }

    #[test]
    fn hook_resubscribes_when_name_or_options_change() {
        let bus = Rc::new(EventBus::<u32>::new());
        let comp = Composition::new();
        let body = |name: &'static str, options| {
            let bus = bus.clone();
            move || use_event_listener(&bus, name, options, vec![Rc::new(|_: &u32| {}) as Listener<u32>])
        };

        comp.compose(body("click", ListenerOptions::empty()));
        assert_eq!(bus.listener_count("click"), 1);

        comp.compose(body("key", ListenerOptions::empty()));
        assert_eq!(bus.listener_count("click"), 0);
        assert_eq!(bus.listener_count("key"), 1);

        comp.compose(body("key", ListenerOptions::PASSIVE));
        assert_eq!(bus.listener_count("key"), 1);
        assert!(!bus.has_active_listeners("key"));
    }
}
