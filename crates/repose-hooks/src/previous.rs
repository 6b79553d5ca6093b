use std::cell::RefCell;
use std::rc::Rc;

use repose_core::{Dispose, disposable_effect, remember};

/// Getter returned by [`use_previous`].
pub struct Previous<T>(Rc<RefCell<T>>);

impl<T> Clone for Previous<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone> Previous<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

/// Getter for the previous value of `value`.
///
/// During a pass the getter still returns the value recorded before it;
/// `value` is recorded after the pass, and only when it changed. Before any
/// change the getter returns `initial`.
pub fn use_previous<T: Clone + PartialEq + 'static>(value: T, initial: T) -> Previous<T> {
    let cell = remember(|| RefCell::new(initial));
    let sink = cell.clone();
    disposable_effect(value.clone(), move || {
        *sink.borrow_mut() = value;
        Dispose::noop()
    });
    Previous(cell)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use repose_core::Composition;

    use super::*;

    #[test]
    fn lags_one_change_behind() {
        let comp = Composition::new();
        let during = Cell::new(0);

        comp.compose(|| during.set(use_previous(1, -1).get()));
        assert_eq!(during.get(), -1);

        comp.compose(|| during.set(use_previous(2, -1).get()));
        assert_eq!(during.get(), 1);

        // unchanged input keeps the last recorded value
        let prev = comp.compose(|| use_previous(2, -1));
        assert_eq!(prev.get(), 2);
    }
}
