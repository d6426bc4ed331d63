//! A string-keyed listener registry.
//!
//! Each event name has an ordered list of listeners. A reverse index from
//! listener to event names allows to unregister a listener everywhere at once.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const DEFAULT_MAX_LISTENERS: usize = 10;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

/// A cloneable handle on a callback.
///
/// Clones share the same identity: registering a clone and unregistering the
/// original targets the same listener.
pub struct Listener<F: ?Sized> {
    id: u64,
    callback: Rc<F>,
}

impl<F: ?Sized> Listener<F> {
    /// Wraps a shared callback into a listener with a fresh identity.
    pub fn from_rc(callback: Rc<F>) -> Self {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            callback,
        }
    }

    #[inline]
    pub fn callback(&self) -> &F {
        &self.callback
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<F: ?Sized> Clone for Listener<F> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<F: ?Sized> PartialEq for Listener<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<F: ?Sized> Eq for Listener<F> {}

impl<F: ?Sized> fmt::Debug for Listener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

/// A listener as stored in the registry, with its registration mode.
pub struct RegisteredListener<F: ?Sized> {
    listener: Listener<F>,
    once: bool,
}

impl<F: ?Sized> RegisteredListener<F> {
    #[inline]
    pub fn listener(&self) -> &Listener<F> {
        &self.listener
    }

    /// If the listener is removed after its first call.
    #[inline]
    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl<F: ?Sized> Clone for RegisteredListener<F> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            once: self.once,
        }
    }
}

impl<F: ?Sized> fmt::Debug for RegisteredListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("listener", &self.listener)
            .field("once", &self.once)
            .finish()
    }
}

/// Registry of listeners keyed by event name.
///
/// Listeners of an event are called in registration order, except the ones
/// added with [`prepend`](Self::prepend) that go to the front of the list.
///
/// ```
/// use oxdelta::{EventRegistry, Listener};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let calls = Rc::new(RefCell::new(Vec::new()));
/// let mut registry = EventRegistry::<dyn Fn(&str)>::new();
/// let first = {
///     let calls = Rc::clone(&calls);
///     Listener::from_rc(Rc::new(move |v: &str| calls.borrow_mut().push(format!("first {v}"))) as Rc<dyn Fn(&str)>)
/// };
/// let second = {
///     let calls = Rc::clone(&calls);
///     Listener::from_rc(Rc::new(move |v: &str| calls.borrow_mut().push(format!("second {v}"))) as Rc<dyn Fn(&str)>)
/// };
/// registry.on("event", first);
/// registry.prepend_once("event", second);
/// registry.emit("event", |f| f("a"));
/// registry.emit("event", |f| f("b"));
/// assert_eq!(*calls.borrow(), ["second a", "first a", "first b"]);
/// ```
pub struct EventRegistry<F: ?Sized> {
    listeners: FxHashMap<String, Vec<RegisteredListener<F>>>,
    events_by_listener: FxHashMap<u64, FxHashSet<String>>,
    max_listeners: usize,
    warned: FxHashSet<String>,
}

impl<F: ?Sized> EventRegistry<F> {
    pub fn new() -> Self {
        Self {
            listeners: FxHashMap::default(),
            events_by_listener: FxHashMap::default(),
            max_listeners: DEFAULT_MAX_LISTENERS,
            warned: FxHashSet::default(),
        }
    }

    /// Appends a listener to the event.
    pub fn on(&mut self, event: impl Into<String>, listener: Listener<F>) {
        self.register(event.into(), listener, false, false);
    }

    /// Appends a listener that is removed after its first call.
    pub fn once(&mut self, event: impl Into<String>, listener: Listener<F>) {
        self.register(event.into(), listener, true, false);
    }

    /// Inserts a listener in front of the ones already registered for the event.
    pub fn prepend(&mut self, event: impl Into<String>, listener: Listener<F>) {
        self.register(event.into(), listener, false, true);
    }

    /// Inserts in front a listener that is removed after its first call.
    pub fn prepend_once(&mut self, event: impl Into<String>, listener: Listener<F>) {
        self.register(event.into(), listener, true, true);
    }

    fn register(&mut self, event: String, listener: Listener<F>, once: bool, prepend: bool) {
        self.events_by_listener
            .entry(listener.id())
            .or_default()
            .insert(event.clone());
        let entry = RegisteredListener { listener, once };
        let listeners = self.listeners.entry(event.clone()).or_default();
        if prepend {
            listeners.insert(0, entry);
        } else {
            listeners.push(entry);
        }
        let count = listeners.len();
        if self.max_listeners > 0 && count > self.max_listeners && !self.warned.contains(&event) {
            warn!(
                event = %event,
                count,
                max_listeners = self.max_listeners,
                "Possible listener leak detected, use set_max_listeners to raise the limit"
            );
            self.warned.insert(event);
        }
    }

    /// Removes the most recently added registration of the listener for the event.
    ///
    /// Returns `true` if a registration was found.
    pub fn off(&mut self, event: &str, listener: &Listener<F>) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let Some(position) = listeners.iter().rposition(|l| l.listener == *listener) else {
            return false;
        };
        listeners.remove(position);
        let still_registered = listeners.iter().any(|l| l.listener == *listener);
        if listeners.is_empty() {
            self.listeners.remove(event);
            self.warned.remove(event);
        }
        if !still_registered {
            self.forget_event(listener.id(), event);
        }
        true
    }

    /// Removes every listener of the event, or of every event if `None`.
    pub fn remove_all_listeners(&mut self, event: Option<&str>) {
        let Some(event) = event else {
            self.listeners.clear();
            self.events_by_listener.clear();
            self.warned.clear();
            return;
        };
        if let Some(listeners) = self.listeners.remove(event) {
            for entry in listeners {
                self.forget_event(entry.listener.id(), event);
            }
        }
        self.warned.remove(event);
    }

    /// Removes the listener from every event it is registered for.
    ///
    /// Returns the number of removed registrations.
    pub fn remove_listener_from_all_events(&mut self, listener: &Listener<F>) -> usize {
        let Some(events) = self.events_by_listener.remove(&listener.id()) else {
            return 0;
        };
        let mut removed = 0;
        for event in events {
            if let Some(listeners) = self.listeners.get_mut(&event) {
                let before = listeners.len();
                listeners.retain(|l| l.listener != *listener);
                removed += before - listeners.len();
                if listeners.is_empty() {
                    self.listeners.remove(&event);
                    self.warned.remove(&event);
                }
            }
        }
        removed
    }

    fn forget_event(&mut self, listener_id: u64, event: &str) {
        if let Some(events) = self.events_by_listener.get_mut(&listener_id) {
            events.remove(event);
            if events.is_empty() {
                self.events_by_listener.remove(&listener_id);
            }
        }
    }

    #[inline]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

    /// Checks if no listener is registered at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// The listeners of the event, in call order.
    pub fn listeners(&self, event: &str) -> Vec<Listener<F>> {
        self.raw_listeners(event)
            .iter()
            .map(|l| l.listener.clone())
            .collect()
    }

    /// The registrations of the event, in call order, including their `once` flag.
    pub fn raw_listeners(&self, event: &str) -> &[RegisteredListener<F>] {
        self.listeners
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The names of the events with at least one listener, in no particular order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }

    /// Sets the number of listeners per event above which a warning is logged.
    ///
    /// `0` disables the warning. The default is 10.
    pub fn set_max_listeners(&mut self, max_listeners: usize) {
        self.max_listeners = max_listeners;
        self.warned.clear();
    }

    #[inline]
    pub fn max_listeners(&self) -> usize {
        self.max_listeners
    }

    /// Calls every listener of the event with `call`, in order.
    ///
    /// The list is snapshotted first and `once` listeners are unregistered before any call.
    /// Returns `true` if the event had listeners.
    pub fn emit(&mut self, event: &str, mut call: impl FnMut(&F)) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let snapshot: Vec<Listener<F>> = listeners.iter().map(|l| l.listener.clone()).collect();
        if listeners.iter().any(|l| l.once) {
            let fired_once: Vec<u64> = listeners
                .iter()
                .filter(|l| l.once)
                .map(|l| l.listener.id())
                .collect();
            listeners.retain(|l| !l.once);
            let remaining: FxHashSet<u64> = listeners.iter().map(|l| l.listener.id()).collect();
            if listeners.is_empty() {
                self.listeners.remove(event);
                self.warned.remove(event);
            }
            for id in fired_once {
                if !remaining.contains(&id) {
                    self.forget_event(id, event);
                }
            }
        }
        for listener in &snapshot {
            call(listener.callback());
        }
        true
    }
}

impl<F: ?Sized> Default for EventRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for EventRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.listeners)
            .field("max_listeners", &self.max_listeners)
            .finish_non_exhaustive()
    }
}
