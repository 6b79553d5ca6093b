//! # Media queries
//!
//! [`use_media_query`] reports whether a media query matches and keeps the
//! answer current while the environment changes. Queries are evaluated by a
//! [`MediaMatcher`]; [`MediaEnvironment`] is the in-process one, driven by
//! whatever owns the window:
//!
//! ```rust
//! use repose_core::Composition;
//! use repose_hooks::media_query::*;
//! use web_time::Duration;
//!
//! let env = MediaEnvironment::new(Viewport::new(1280.0, 800.0));
//! let options = MediaQueryOptions {
//!     throttle: Some(Duration::ZERO),
//!     ..Default::default()
//! };
//! let wide = |env: &MediaEnvironment| use_media_query(env, "(min-width: 1000px)", options);
//!
//! let comp = Composition::new();
//! assert!(comp.compose(|| wide(&env)));
//!
//! env.set_viewport(Viewport::new(720.0, 1280.0));
//! assert!(comp.is_invalidated());
//! assert!(!comp.compose(|| wide(&env)));
//! ```
//!
//! Supported syntax: the media types `all` and `screen`, and the features
//! `min-width`, `max-width`, `min-height`, `max-height` (in `px`),
//! `orientation` and `prefers-color-scheme`, joined with `and`. A
//! comma-separated list matches when any of its queries does.

use std::cell::Cell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use repose_core::{Dispose, Signal, disposable_effect};
use web_time::Duration;

use crate::delayed::{DelayFn, DelayedSetter};
use crate::error::{HookError, Result};
use crate::lifecycle::use_mounted_state;
use crate::settings::settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// What media queries are evaluated against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub color_scheme: ColorScheme,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            color_scheme: ColorScheme::Light,
        }
    }

    pub fn with_color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    pub fn orientation(&self) -> Orientation {
        if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Feature {
    Any,
    MinWidth(f32),
    MaxWidth(f32),
    MinHeight(f32),
    MaxHeight(f32),
    Orientation(Orientation),
    ColorScheme(ColorScheme),
}

impl Feature {
    fn test(self, vp: &Viewport) -> bool {
        match self {
            Feature::Any => true,
            Feature::MinWidth(px) => vp.width >= px,
            Feature::MaxWidth(px) => vp.width <= px,
            Feature::MinHeight(px) => vp.height >= px,
            Feature::MaxHeight(px) => vp.height <= px,
            Feature::Orientation(o) => vp.orientation() == o,
            Feature::ColorScheme(c) => vp.color_scheme == c,
        }
    }
}

/// A parsed media query list.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQuery {
    any_of: Vec<Vec<Feature>>,
}

impl MediaQuery {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: String| HookError::MediaQuery {
            query: source.to_owned(),
            reason,
        };
        let any_of = source
            .split(',')
            .map(|query| {
                query
                    .split(" and ")
                    .map(|part| parse_feature(part.trim()).map_err(&invalid))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { any_of })
    }

    pub fn matches(&self, vp: &Viewport) -> bool {
        self.any_of
            .iter()
            .any(|all| all.iter().all(|f| f.test(vp)))
    }
}

fn parse_feature(part: &str) -> std::result::Result<Feature, String> {
    if part.eq_ignore_ascii_case("all") || part.eq_ignore_ascii_case("screen") {
        return Ok(Feature::Any);
    }
    let inner = part
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix(')'))
        .ok_or_else(|| format!("expected a media type or '(feature: value)', got '{part}'"))?;
    let (name, value) = inner
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in '{inner}'"))?;
    let (name, value) = (name.trim(), value.trim());

    let px = || -> std::result::Result<f32, String> {
        value
            .strip_suffix("px")
            .unwrap_or(value)
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("bad length '{value}': {e}"))
    };

    Ok(match name {
        "min-width" => Feature::MinWidth(px()?),
        "max-width" => Feature::MaxWidth(px()?),
        "min-height" => Feature::MinHeight(px()?),
        "max-height" => Feature::MaxHeight(px()?),
        "orientation" => Feature::Orientation(match value {
            "portrait" => Orientation::Portrait,
            "landscape" => Orientation::Landscape,
            other => return Err(format!("unknown orientation '{other}'")),
        }),
        "prefers-color-scheme" => Feature::ColorScheme(match value {
            "light" => ColorScheme::Light,
            "dark" => ColorScheme::Dark,
            other => return Err(format!("unknown color scheme '{other}'")),
        }),
        other => return Err(format!("unsupported feature '{other}'")),
    })
}

/// Evaluates media queries and reports when their result changes.
pub trait MediaMatcher {
    fn matches(&self, query: &str) -> bool;

    /// Call `on_change` with the new result each time it flips. The returned
    /// handle stops watching.
    fn watch(&self, query: &str, on_change: Rc<dyn Fn(bool)>) -> Dispose;
}

/// In-process [`MediaMatcher`] over a [`Viewport`]. Clones share the
/// viewport and its watchers.
#[derive(Clone)]
pub struct MediaEnvironment {
    viewport: Signal<Viewport>,
}

impl Default for MediaEnvironment {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl MediaEnvironment {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Signal::new(viewport),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        if self.viewport.get() != viewport {
            self.viewport.set(viewport);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.viewport.subscriber_count()
    }
}

impl MediaMatcher for MediaEnvironment {
    fn matches(&self, query: &str) -> bool {
        match MediaQuery::parse(query) {
            Ok(q) => self.viewport.with(|vp| q.matches(vp)),
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    fn watch(&self, query: &str, on_change: Rc<dyn Fn(bool)>) -> Dispose {
        let parsed = match MediaQuery::parse(query) {
            Ok(q) => q,
            Err(e) => {
                log::warn!("{e}");
                return Dispose::noop();
            }
        };
        let last = Cell::new(self.viewport.with(|vp| parsed.matches(vp)));
        let id = self.viewport.subscribe(move |vp| {
            let now = parsed.matches(vp);
            if now != last.get() {
                last.set(now);
                on_change(now);
            }
        });
        let viewport = self.viewport.clone();
        Dispose::new(move || {
            viewport.unsubscribe(id);
        })
    }
}

/// Unset fields fall back to [`HookSettings`](crate::settings::HookSettings).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediaQueryOptions {
    /// Follow changes after the first evaluation.
    pub track: Option<bool>,
    /// Minimum spacing of change notifications; zero delivers each one.
    pub throttle: Option<Duration>,
}

impl MediaQueryOptions {
    fn resolve(self) -> (bool, Duration) {
        let defaults = settings();
        (
            self.track.unwrap_or(defaults.media_query.track),
            self.throttle.unwrap_or(defaults.delay),
        )
    }
}

/// Wraps `sink` in a leading+trailing throttle unless `delay` is zero. The
/// returned handle drops a pending trailing call.
fn throttled<T: 'static>(delay: Duration, sink: impl Fn(T) + 'static) -> (Rc<dyn Fn(T)>, Dispose) {
    if delay.is_zero() {
        let notify: Rc<dyn Fn(T)> = Rc::new(sink);
        return (notify, Dispose::noop());
    }
    let setter = DelayedSetter::new(sink, delay, DelayFn::Throttle);
    let cancel = setter.clone();
    let notify: Rc<dyn Fn(T)> = Rc::new(move |value| setter.call(value));
    (notify, Dispose::new(move || cancel.cancel()))
}

/// Whether `query` currently matches.
pub fn use_media_query<M>(matcher: &M, query: &str, options: MediaQueryOptions) -> bool
where
    M: MediaMatcher + Clone + 'static,
{
    let (track, throttle) = options.resolve();
    let (matches, set) = use_mounted_state(|| matcher.matches(query));

    let matcher = matcher.clone();
    let key = (query.to_owned(), track, throttle);
    disposable_effect(key.clone(), move || {
        let (query, track, throttle) = key;
        set.set_if_changed(matcher.matches(&query));
        if !track {
            return Dispose::noop();
        }
        let (notify, cancel) = throttled(throttle, move |m| set.set_if_changed(m));
        let stop = matcher.watch(&query, notify);
        Dispose::all(vec![stop, cancel])
    });

    matches
}

/// [`use_media_query`] for several queries at once, keyed by `K`.
pub fn use_media_queries<K, M>(
    matcher: &M,
    queries: &[(K, &str)],
    options: MediaQueryOptions,
) -> HashMap<K, bool>
where
    K: Eq + Hash + Clone + 'static,
    M: MediaMatcher + Clone + 'static,
{
    let (track, throttle) = options.resolve();
    let evaluate = |matcher: &M, queries: &[(K, String)]| -> HashMap<K, bool> {
        queries
            .iter()
            .map(|(k, q)| (k.clone(), matcher.matches(q)))
            .collect()
    };

    let owned: Vec<(K, String)> = queries
        .iter()
        .map(|(k, q)| (k.clone(), (*q).to_owned()))
        .collect();
    let (matches, set) = use_mounted_state(|| evaluate(matcher, &owned));

    let matcher = matcher.clone();
    disposable_effect((owned.clone(), track, throttle), move || {
        set.set_if_changed(evaluate(&matcher, &owned));
        if !track {
            return Dispose::noop();
        }
        let parts = owned
            .into_iter()
            .flat_map(|(key, query)| {
                let set = set.clone();
                let (notify, cancel) = throttled(throttle, move |m: bool| {
                    let key = key.clone();
                    set.update(move |current| {
                        let mut next = current.clone();
                        next.insert(key, m);
                        next
                    });
                });
                [matcher.watch(&query, notify), cancel]
            })
            .collect();
        Dispose::all(parts)
    });

    matches
}

#[cfg(test)]
mod tests {
    use repose_core::Composition;

    use super::*;
    use crate::testing::{advance, manual_clock};

    fn instant() -> MediaQueryOptions {
        MediaQueryOptions {
            throttle: Some(Duration::ZERO),
            ..MediaQueryOptions::default()
        }
    }

    #[test]
    fn parses_and_evaluates() {
        let phone = Viewport::new(390.0, 844.0).with_color_scheme(ColorScheme::Dark);
        let desktop = Viewport::new(1920.0, 1080.0);
        let check = |q: &str, vp: &Viewport| MediaQuery::parse(q).map(|m| m.matches(vp));

        assert_eq!(check("(max-width: 600px)", &phone).ok(), Some(true));
        assert_eq!(check("screen and (min-width: 600px)", &phone).ok(), Some(false));
        assert_eq!(check("(orientation: landscape)", &desktop).ok(), Some(true));
        assert_eq!(
            check("(min-width: 1000px), (prefers-color-scheme: dark)", &phone).ok(),
            Some(true)
        );
        assert_eq!(
            check("(min-height: 800) and (orientation: portrait)", &phone).ok(),
            Some(true)
        );

        assert!(matches!(
            MediaQuery::parse("(hover: hover)"),
            Err(HookError::MediaQuery { .. })
        ));
        assert!(MediaQuery::parse("min-width: 10px").is_err());
        assert!(MediaQuery::parse("(max-width: wide)").is_err());
    }

    #[test]
    fn invalid_query_never_matches() {
        let env = MediaEnvironment::default();
        assert!(!env.matches("(nonsense)"));
        let d = env.watch("(nonsense)", Rc::new(|_: bool| {}));
        assert_eq!(env.watcher_count(), 0);
        d.run();
    }

    #[test]
    fn tracks_changes_and_unsubscribes() {
        let env = MediaEnvironment::new(Viewport::new(800.0, 600.0));
        let comp = Composition::new();
        let body = || use_media_query(&env, "(min-width: 600px)", instant());

        assert!(comp.compose(body));
        assert_eq!(env.watcher_count(), 1);

        env.set_viewport(Viewport::new(500.0, 600.0));
        assert!(!comp.compose(body));

        // resize that does not flip the result
        env.set_viewport(Viewport::new(400.0, 600.0));
        assert!(!comp.is_invalidated());

        comp.dispose();
        assert_eq!(env.watcher_count(), 0);
    }

    #[test]
    fn untracked_reads_once() {
        let env = MediaEnvironment::new(Viewport::new(800.0, 600.0));
        let comp = Composition::new();
        let options = MediaQueryOptions {
            track: Some(false),
            ..instant()
        };
        assert!(comp.compose(|| use_media_query(&env, "(min-width: 600px)", options)));
        assert_eq!(env.watcher_count(), 0);
        env.set_viewport(Viewport::new(500.0, 600.0));
        assert!(!comp.is_invalidated());
    }

    #[test]
    fn notifications_are_throttled_by_default() {
        let clock = manual_clock();
        let env = MediaEnvironment::new(Viewport::new(800.0, 600.0));
        let comp = Composition::new();
        let body = || use_media_query(&env, "(min-width: 600px)", MediaQueryOptions::default());
        comp.compose(body);

        env.set_viewport(Viewport::new(500.0, 600.0));
        assert!(!comp.compose(body));

        // flips back and forth inside the window; only the last one lands
        env.set_viewport(Viewport::new(700.0, 600.0));
        env.set_viewport(Viewport::new(550.0, 600.0));
        env.set_viewport(Viewport::new(900.0, 600.0));
        assert!(!comp.is_invalidated());

        advance(&clock, 300);
        assert!(comp.compose(body));
    }

    #[test]
    fn several_queries_by_key() {
        let env = MediaEnvironment::new(Viewport::new(800.0, 600.0));
        let comp = Composition::new();
        let body = || {
            use_media_queries(
                &env,
                &[("wide", "(min-width: 700px)"), ("tall", "(orientation: portrait)")],
                instant(),
            )
        };

        let m = comp.compose(body);
        assert!(m["wide"]);
        assert!(!m["tall"]);
        assert_eq!(env.watcher_count(), 2);

        env.set_viewport(Viewport::new(600.0, 900.0));
        let m = comp.compose(body);
        assert!(!m["wide"]);
        assert!(m["tall"]);

        comp.dispose();
        assert_eq!(env.watcher_count(), 0);
    }
}
