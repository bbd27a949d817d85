//! Observable single-value cells.
//!
//! A `Slot` is how one collaborator publishes a resource to the others. The
//! build is single-threaded, so slots use `Rc`/`RefCell` and observers run
//! synchronously inside `set`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ForgeError, ForgeResult};

type Observer<T> = Rc<dyn Fn(&T)>;

struct SlotCell<T> {
    name: &'static str,
    current: RefCell<Option<T>>,
    observers: RefCell<Vec<Observer<T>>>,
}

/// A typed, observable, mutable cell holding at most one current value.
///
/// `set` overwrites the value and notifies every observer, in registration
/// order, once per call. Registering an observer never replays a value that
/// is already present.
///
/// # Example
///
/// ```rust
/// use forgewire::Slot;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let slot: Slot<u32> = Slot::new("count");
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let sink = Rc::clone(&seen);
/// slot.on_set(move |v| sink.borrow_mut().push(*v));
///
/// slot.set(1);
/// slot.set(2);
///
/// assert_eq!(slot.get(), Some(2));
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct Slot<T> {
    inner: Rc<SlotCell<T>>,
}

impl<T: Clone + 'static> Slot<T> {
    /// Create an empty slot with a diagnostic name.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Rc::new(SlotCell {
                name,
                current: RefCell::new(None),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The diagnostic name of this slot.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Overwrite the current value and notify every observer.
    pub fn set(&self, value: T) {
        *self.inner.current.borrow_mut() = Some(value.clone());

        // Snapshot so observers may register more observers or set other slots.
        let observers: Vec<Observer<T>> = self.inner.observers.borrow().clone();
        for observer in observers {
            observer(&value);
        }
    }

    /// The current value, if any.
    pub fn get(&self) -> Option<T> {
        self.inner.current.borrow().clone()
    }

    /// Check whether a value has been set.
    pub fn is_set(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// The current value, or a `MissingDependency` error naming this slot.
    pub fn require(&self) -> ForgeResult<T> {
        self.get()
            .ok_or(ForgeError::MissingDependency { slot: self.name() })
    }

    /// Register an observer for every future `set`.
    pub fn on_set(&self, observer: impl Fn(&T) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    pub(crate) fn downgrade(&self) -> WeakSlot<T> {
        WeakSlot {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.inner.name)
            .field("set", &self.inner.current.borrow().is_some())
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

/// Non-owning reference to a slot, held by join combinators so observers
/// never keep their own slot alive.
pub(crate) struct WeakSlot<T> {
    inner: Weak<SlotCell<T>>,
}

impl<T: Clone> WeakSlot<T> {
    /// The slot's current value, or `None` if it is empty or gone.
    pub(crate) fn value(&self) -> Option<T> {
        self.inner
            .upgrade()
            .and_then(|cell| cell.current.borrow().clone())
    }
}
