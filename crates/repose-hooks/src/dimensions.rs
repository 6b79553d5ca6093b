use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use repose_core::timer::sleep;
use repose_core::{Latest, MutableState, remember_latest, remember_mutable_state};
use web_time::Duration;

use crate::error::{HookError, Result};
use crate::promise::{Deps, PromiseOptions, TriggerMode, use_promise};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Anything that can report its laid-out size.
pub trait Measurable {
    fn measure(&self) -> Dimensions;
}

/// Callback told about every attach (`Some`) and detach (`None`).
pub type AttachForward = Rc<dyn Fn(Option<&dyn Measurable>)>;

/// Attach point returned by [`use_dimensions`].
#[derive(Clone)]
pub struct DimensionsTracker {
    state: MutableState<Option<Dimensions>>,
    forward: Latest<Option<AttachForward>>,
}

impl DimensionsTracker {
    /// Measure `target` now and forward it.
    pub fn attach(&self, target: &dyn Measurable) {
        if let Some(Some(f)) = self.forward.get() {
            f(Some(target));
        }
        self.state.set_if_changed(Some(target.measure()));
    }

    pub fn detach(&self) {
        if let Some(Some(f)) = self.forward.get() {
            f(None);
        }
        self.state.set_if_changed(None);
    }
}

/// Size of whatever gets attached to the returned tracker. `forward`, if
/// given, sees every attach and detach as well.
pub fn use_dimensions(forward: Option<AttachForward>) -> (Option<Dimensions>, DimensionsTracker) {
    let state = remember_mutable_state(|| None);
    let forward = remember_latest(forward);
    (state.get(), DimensionsTracker { state, forward })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl Deps for MediaKind {}

/// Loads a media source far enough to know its intrinsic size.
pub trait MediaProbe {
    fn load(&self, src: &str, kind: MediaKind) -> LocalBoxFuture<'static, Result<Dimensions>>;
}

/// In-process [`MediaProbe`] answering from a table, each entry after its
/// own delay. Unknown sources fail with [`HookError::MediaLoad`].
#[derive(Clone, Default)]
pub struct MediaCatalog {
    entries: Rc<RefCell<HashMap<String, (MediaKind, Dimensions, Duration)>>>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, src: impl Into<String>, kind: MediaKind, size: Dimensions, delay: Duration) {
        self.entries
            .borrow_mut()
            .insert(src.into(), (kind, size, delay));
    }
}

impl MediaProbe for MediaCatalog {
    fn load(&self, src: &str, kind: MediaKind) -> LocalBoxFuture<'static, Result<Dimensions>> {
        let entry = self.entries.borrow().get(src).copied();
        let src = src.to_owned();
        async move {
            let Some((stored_kind, size, delay)) = entry else {
                return Err(HookError::MediaLoad {
                    src,
                    reason: "not found".into(),
                });
            };
            sleep(delay).await;
            if stored_kind != kind {
                return Err(HookError::MediaLoad {
                    src,
                    reason: format!("expected {kind:?}, found {stored_kind:?}"),
                });
            }
            Ok(size)
        }
        .boxed_local()
    }
}

/// Intrinsic size of the media at `src`, `None` while it loads or when it
/// failed to load. A newer `src` always wins over a slower older one.
pub fn use_media_dimensions<P>(probe: &P, src: Option<&str>, kind: MediaKind) -> Option<Dimensions>
where
    P: MediaProbe + Clone + 'static,
{
    let probe = probe.clone();
    let p = use_promise(
        move |(src, kind): (Option<String>, MediaKind)| match src {
            Some(src) => probe.load(&src, kind).map(|r| r.map_err(Rc::new)).boxed_local(),
            None => future::ready(Err(Rc::new(HookError::MediaLoad {
                src: String::new(),
                reason: "no source".into(),
            })))
            .boxed_local(),
        },
        TriggerMode::Auto((src.map(str::to_owned), kind)),
        PromiseOptions::new()
            .take_last()
            .on_error(|e: &Rc<HookError>| log::warn!("media dimensions: {e}")),
    );
    p.data
}
