use repose_core::{MutableState, remember_mutable_state};

/// Setters for a [`use_boolean`] flag.
#[derive(Clone)]
pub struct BoolHandle(MutableState<bool>);

impl BoolHandle {
    pub fn set_true(&self) {
        self.0.set(true);
    }

    pub fn set_false(&self) {
        self.0.set(false);
    }

    pub fn toggle(&self) {
        self.0.update(|v| *v = !*v);
    }

    pub fn set(&self, value: bool) {
        self.0.set(value);
    }

    /// Current value, including writes made since the last pass.
    pub fn get(&self) -> bool {
        self.0.get()
    }
}

pub fn use_boolean(initial: bool) -> (bool, BoolHandle) {
    let state = remember_mutable_state(|| initial);
    (state.get(), BoolHandle(state))
}

#[cfg(test)]
mod tests {
    use repose_core::Composition;

    use super::*;

    #[test]
    fn setters_and_toggle() {
        let comp = Composition::new();
        let (value, flag) = comp.compose(|| use_boolean(false));
        assert!(!value);

        flag.toggle();
        assert!(comp.is_invalidated());
        assert!(comp.compose(|| use_boolean(false)).0);

        flag.set_false();
        assert!(!flag.get());
        flag.set_true();
        flag.toggle();
        flag.toggle();
        assert!(comp.compose(|| use_boolean(false)).0);

        flag.set(false);
        assert!(!comp.compose(|| use_boolean(true)).0);
    }
}
