use std::cell::RefCell;
use std::rc::Rc;

use crate::invalidate;

pub type SubId = usize;

pub struct Signal<T: 'static> {
    inner: Rc<RefCell<Inner<T>>>,
    id: invalidate::SignalId,
}

struct Inner<T> {
    value: T,
    subs: Vec<Box<dyn Fn(&T)>>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                subs: Vec::new(),
            })),
            id: invalidate::next_signal_id(),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        invalidate::register_signal_read(self.id);
        self.inner.borrow().value.clone()
    }

    /// Reads the value in place without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        invalidate::register_signal_read(self.id);
        f(&self.inner.borrow().value)
    }

    pub fn set(&self, v: T) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = v;
            let vref = &inner.value;
            for s in &inner.subs {
                s(vref);
            }
        }
        invalidate::signal_changed(self.id);
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
            let vref = &inner.value;
            for s in &inner.subs {
                s(vref);
            }
        }
        invalidate::signal_changed(self.id);
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.inner.borrow_mut().subs.push(Box::new(f));
        self.inner.borrow().subs.len() - 1
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            id: self.id,
        }
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}
