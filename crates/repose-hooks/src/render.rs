use std::cell::Cell;
use std::rc::Rc;

use repose_core::{Invalidator, current_invalidator, remember, side_effect};

/// Number of completed passes of the calling component.
#[derive(Clone, Debug)]
pub struct RenderCount(Rc<Cell<u64>>);

impl RenderCount {
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

pub fn use_render_count() -> RenderCount {
    let count = remember(|| Cell::new(0u64));
    let bump = count.clone();
    side_effect(move || bump.set(bump.get() + 1));
    RenderCount(count)
}

/// Forces the calling component to compose again.
#[derive(Clone)]
pub struct ReRender(Invalidator);

impl ReRender {
    pub fn trigger(&self) {
        self.0.invalidate();
    }
}

pub fn use_re_render_trigger() -> ReRender {
    ReRender(current_invalidator().unwrap_or_else(Invalidator::detached))
}
