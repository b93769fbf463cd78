use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared, optional slot owned by the host UI.
///
/// Clones refer to the same slot. Setting a value is how the host asks for a
/// presentation; the presentation controller writes `None` back when the
/// picker is dismissed. Main thread only.
pub struct Binding<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Binding<T> {
    pub fn new(value: Option<T>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(value)),
        }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Replaces the value.
    ///
    /// # Panics
    /// If called from inside [`Binding::with`] on the same slot.
    pub fn set(&self, value: Option<T>) {
        *self.slot.borrow_mut() = value;
    }

    pub fn take(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }

    pub fn is_some(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(Option<&T>) -> R,
    {
        f(self.slot.borrow().as_ref())
    }

    /// Whether both handles point at the same slot.
    pub fn same_slot(&self, other: &Binding<T>) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> Binding<T> {
    pub fn get(&self) -> Option<T> {
        self.slot.borrow().clone()
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.slot.borrow()).finish()
    }
}
