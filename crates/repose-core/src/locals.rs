//! # Composition locals
//!
//! Thread‑local values visible to everything composed inside a closure,
//! looked up by type. Libraries use them for ambient configuration (hook
//! settings, host services) instead of threading parameters through every
//! call:
//!
//! ```rust
//! use repose_core::*;
//!
//! #[derive(Clone, Default, PartialEq, Debug)]
//! struct Accent(&'static str);
//!
//! assert_eq!(local_or_default::<Accent>(), Accent(""));
//! provide(Accent("teal"), || {
//!     assert_eq!(local::<Accent>(), Some(Accent("teal")));
//!     provide(Accent("rust"), || assert_eq!(local::<Accent>(), Some(Accent("rust"))));
//! });
//! assert_eq!(local::<Accent>(), None);
//! ```
//!
//! Locals are only visible while the closure runs. Values captured later by
//! effects or tasks should be read during composition and moved in.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> = const { RefCell::new(Vec::new()) };
}

/// Make `value` the local of its type for the duration of `f`.
pub fn provide<T: Clone + 'static, R>(value: T, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        set_local_boxed(TypeId::of::<T>(), Box::new(value));
        f()
    })
}

/// Innermost provided value of type `T`.
pub fn local<T: Clone + 'static>() -> Option<T> {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<T>())
                && let Some(t) = v.downcast_ref::<T>()
            {
                return Some(t.clone());
            }
        }
        None
    })
}

pub fn local_or_default<T: Clone + Default + 'static>() -> T {
    local::<T>().unwrap_or_default()
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Non-panicking frame guard (ensures pop on unwind)
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

fn set_local_boxed(t: TypeId, v: Box<dyn Any>) {
    LOCALS_STACK.with(|st| {
        if let Some(top) = st.borrow_mut().last_mut() {
            top.insert(t, v);
        }
    });
}
