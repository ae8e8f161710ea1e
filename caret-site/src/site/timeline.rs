//! Animation timelines for the marketing sections.
//!
//! A [`Timeline`] is a list of tracks, each animating one property of one
//! target element through a set of keyframes once its trigger fires. The
//! [`Scheduler`] is driven by load, scroll and frame events and samples the
//! current value of every track.
//!
//! The server uses a fresh scheduler to render the initial frame of each
//! animated element as a stylesheet scoped to pages where script runs; the
//! timelines themselves are shipped to the page as JSON for the browser
//! runtime (`assets/timeline.js`).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Animatable properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Opacity,
    /// Pixels
    TranslateX,
    /// Pixels
    TranslateY,
    Scale,
    /// Degrees
    Rotate,
    /// Percent of the element hidden from the bottom edge
    ClipInset,
}

/// Timing function mapping linear progress to eased progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Easing {
    Linear,
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
    Spring { stiffness: f64, damping: f64, mass: f64 },
}

impl Easing {
    /// The studio's signature ease-out curve
    pub const EASE_OUT_EXPO: Easing = Easing::CubicBezier {
        x1: 0.22,
        y1: 1.0,
        x2: 0.36,
        y2: 1.0,
    };

    /// Eased progress for linear progress `t` in `[0, 1]`.
    ///
    /// `duration_ms` only matters for springs, whose shape depends on real time.
    pub fn apply(&self, t: f64, duration_ms: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        match *self {
            Easing::Linear => t,
            Easing::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(x1, y1, x2, y2, t),
            Easing::Spring {
                stiffness,
                damping,
                mass,
            } => spring(stiffness, damping, mass, t * duration_ms / 1000.0),
        }
    }
}

fn bezier_component(a1: f64, a2: f64, s: f64) -> f64 {
    // B(s) = 3(1-s)^2 s a1 + 3(1-s) s^2 a2 + s^3
    let inv = 1.0 - s;
    3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
}

fn bezier_slope(a1: f64, a2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * a1 + 6.0 * inv * s * (a2 - a1) + 3.0 * s * s * (1.0 - a2)
}

/// Solve x(s) = x for s, then return y(s).
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    let mut s = x;
    for _ in 0..8 {
        let err = bezier_component(x1, x2, s) - x;
        if err.abs() < 1e-7 {
            return bezier_component(y1, y2, s);
        }
        let slope = bezier_slope(x1, x2, s);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    // Newton did not converge; bisect
    let (mut lo, mut hi) = (0.0, 1.0);
    s = x;
    while hi - lo > 1e-7 {
        let value = bezier_component(x1, x2, s);
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    bezier_component(y1, y2, s)
}

/// Displacement of a unit spring released from 0 towards 1 after `secs`.
fn spring(stiffness: f64, damping: f64, mass: f64, secs: f64) -> f64 {
    let omega = (stiffness / mass).sqrt();
    let zeta = damping / (2.0 * (stiffness * mass).sqrt());

    if zeta < 1.0 {
        let omega_d = omega * (1.0 - zeta * zeta).sqrt();
        let envelope = (-zeta * omega * secs).exp();
        1.0 - envelope
            * ((omega_d * secs).cos() + (zeta * omega / omega_d) * (omega_d * secs).sin())
    } else if zeta == 1.0 {
        1.0 - (-omega * secs).exp() * (1.0 + omega * secs)
    } else {
        let root = (zeta * zeta - 1.0).sqrt();
        let r1 = -omega * (zeta - root);
        let r2 = -omega * (zeta + root);
        let c2 = r1 / (r2 - r1);
        let c1 = -1.0 - c2;
        1.0 + c1 * (r1 * secs).exp() + c2 * (r2 * secs).exp()
    }
}

/// When a track starts playing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// As soon as the page loads
    OnLoad,
    /// When the target enters the viewport, shrunk (negative) or grown by `margin_px`
    InView { margin_px: f64, once: bool },
    /// Progress follows scrolling: 0 at `start`, 1 at `end`, both fractions of the
    /// target's passage through the viewport
    ScrollLinked { start: f64, end: f64 },
}

/// One property of one target animated through keyframes.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub target: String,
    pub property: Property,
    /// Values spread evenly over the track's duration
    pub keyframes: Vec<f64>,
    pub trigger: Trigger,
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Track {
    pub fn new(target: impl Into<String>, property: Property, keyframes: Vec<f64>) -> Self {
        Self {
            target: target.into(),
            property,
            keyframes,
            trigger: Trigger::OnLoad,
            delay_ms: 0.0,
            duration_ms: 700.0,
            easing: Easing::EASE_OUT_EXPO,
        }
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Interpolated value at eased progress `p`.
    pub fn value_at(&self, p: f64) -> f64 {
        match self.keyframes.as_slice() {
            [] => 0.0,
            [only] => *only,
            frames => {
                let p = p.clamp(0.0, 1.0);
                let segments = (frames.len() - 1) as f64;
                let position = p * segments;
                let index = (position.floor() as usize).min(frames.len() - 2);
                let local = position - index as f64;
                frames[index] + (frames[index + 1] - frames[index]) * local
            }
        }
    }

    fn initial_value(&self) -> f64 {
        self.keyframes.first().copied().unwrap_or(0.0)
    }
}

/// A named group of tracks; `stagger_ms` delays the n-th track by `n * stagger_ms`.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub name: String,
    pub stagger_ms: f64,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stagger_ms: 0.0,
            tracks: Vec::new(),
        }
    }

    pub fn stagger(mut self, stagger_ms: f64) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Total delay of the track at `index`, stagger included.
    pub fn start_offset(&self, index: usize) -> f64 {
        self.tracks
            .get(index)
            .map(|t| t.delay_ms + self.stagger_ms * index as f64)
            .unwrap_or(0.0)
    }
}

/// Visible window of the page
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    pub height: f64,
}

/// Layout box of a target element (page coordinates)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    fn in_view(&self, viewport: &Viewport, margin_px: f64) -> bool {
        let view_top = viewport.scroll_y - margin_px;
        let view_bottom = viewport.scroll_y + viewport.height + margin_px;
        self.top < view_bottom && self.top + self.height > view_top
    }

    /// 0 when the top edge reaches the viewport bottom, 1 when the bottom edge leaves the top.
    fn passage(&self, viewport: &Viewport) -> f64 {
        let distance = viewport.height + self.height;
        if distance <= 0.0 {
            return 0.0;
        }
        ((viewport.scroll_y + viewport.height - self.top) / distance).clamp(0.0, 1.0)
    }
}

/// Current value of one track
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub target: String,
    pub property: Property,
    pub value: f64,
}

/// (timeline index, track index)
type TrackKey = (usize, usize);

/// Evaluates timelines against load/scroll/frame events.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timelines: Vec<Timeline>,
    layout: HashMap<String, Bounds>,
    viewport: Viewport,
    now_ms: f64,
    /// Start time of every playing time-based track
    started: HashMap<TrackKey, f64>,
    /// `once` tracks that already fired and must not reset
    latched: HashSet<TrackKey>,
}

impl Scheduler {
    pub fn new(timelines: Vec<Timeline>) -> Self {
        Self {
            timelines,
            layout: HashMap::new(),
            viewport: Viewport::default(),
            now_ms: 0.0,
            started: HashMap::new(),
            latched: HashSet::new(),
        }
    }

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    /// Record where a target sits on the page.
    pub fn set_bounds(&mut self, target: impl Into<String>, bounds: Bounds) {
        self.layout.insert(target.into(), bounds);
    }

    /// Page finished loading: start every `OnLoad` track.
    pub fn on_load(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
        for key in self.keys() {
            if matches!(self.track(key).trigger, Trigger::OnLoad) {
                self.started.entry(key).or_insert(now_ms);
            }
        }
    }

    /// Viewport moved: start tracks whose targets came into view and reset
    /// repeatable ones that left it.
    pub fn on_scroll(&mut self, viewport: Viewport, now_ms: f64) {
        self.viewport = viewport;
        self.now_ms = now_ms;

        for key in self.keys() {
            let track = self.track(key);
            let Trigger::InView { margin_px, once } = track.trigger else {
                continue;
            };
            let visible = self
                .layout
                .get(&track.target)
                .is_some_and(|b| b.in_view(&viewport, margin_px));

            if visible {
                self.started.entry(key).or_insert(now_ms);
                if once {
                    self.latched.insert(key);
                }
            } else if !self.latched.contains(&key) {
                self.started.remove(&key);
            }
        }
    }

    /// Advance the clock (animation frame).
    pub fn tick(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    /// Current value of every track, in timeline order.
    pub fn sample(&self) -> Vec<Sample> {
        self.keys()
            .into_iter()
            .map(|key| {
                let track = self.track(key);
                Sample {
                    target: track.target.clone(),
                    property: track.property,
                    value: self.value(key),
                }
            })
            .collect()
    }

    fn value(&self, key: TrackKey) -> f64 {
        let timeline = &self.timelines[key.0];
        let track = &timeline.tracks[key.1];

        let progress = match track.trigger {
            Trigger::ScrollLinked { start, end } => {
                let Some(bounds) = self.layout.get(&track.target) else {
                    return track.initial_value();
                };
                let passage = bounds.passage(&self.viewport);
                if end <= start {
                    if passage >= end { 1.0 } else { 0.0 }
                } else {
                    ((passage - start) / (end - start)).clamp(0.0, 1.0)
                }
            }
            Trigger::OnLoad | Trigger::InView { .. } => {
                let Some(started_at) = self.started.get(&key) else {
                    return track.initial_value();
                };
                let elapsed = self.now_ms - started_at - timeline.start_offset(key.1);
                if track.duration_ms <= 0.0 {
                    if elapsed >= 0.0 { 1.0 } else { 0.0 }
                } else {
                    (elapsed / track.duration_ms).clamp(0.0, 1.0)
                }
            }
        };

        track.value_at(track.easing.apply(progress, track.duration_ms))
    }

    /// CSS declarations for a target's current frame.
    pub fn inline_style(&self, target: &str) -> String {
        let values: HashMap<Property, f64> = self
            .sample()
            .into_iter()
            .filter(|s| s.target == target)
            .map(|s| (s.property, s.value))
            .collect();

        let mut declarations = Vec::new();
        if let Some(opacity) = values.get(&Property::Opacity) {
            declarations.push(format!("opacity: {}", round(*opacity)));
        }

        let mut transforms = Vec::new();
        let tx = values.get(&Property::TranslateX).copied();
        let ty = values.get(&Property::TranslateY).copied();
        if tx.is_some() || ty.is_some() {
            transforms.push(format!(
                "translate({}px, {}px)",
                round(tx.unwrap_or(0.0)),
                round(ty.unwrap_or(0.0))
            ));
        }
        if let Some(scale) = values.get(&Property::Scale) {
            transforms.push(format!("scale({})", round(*scale)));
        }
        if let Some(rotate) = values.get(&Property::Rotate) {
            transforms.push(format!("rotate({}deg)", round(*rotate)));
        }
        if !transforms.is_empty() {
            declarations.push(format!("transform: {}", transforms.join(" ")));
        }

        if let Some(inset) = values.get(&Property::ClipInset) {
            declarations.push(format!("clip-path: inset(0 0 {}% 0)", round(*inset)));
        }

        declarations.join("; ")
    }

    /// Initial-frame style of every target.
    pub fn initial_styles(timelines: &[Timeline]) -> HashMap<String, String> {
        let scheduler = Scheduler::new(timelines.to_vec());
        let targets: HashSet<&str> = timelines
            .iter()
            .flat_map(|t| t.tracks.iter().map(|track| track.target.as_str()))
            .collect();
        targets
            .into_iter()
            .map(|target| (target.to_string(), scheduler.inline_style(target)))
            .collect()
    }

    /// Initial frame of every target as CSS rules, each nested under `scope`
    /// so nothing is hidden unless the scope selector matches.
    pub fn initial_stylesheet(timelines: &[Timeline], scope: &str) -> String {
        let styles: BTreeMap<String, String> = Self::initial_styles(timelines)
            .into_iter()
            .filter(|(_, style)| !style.is_empty())
            .collect();

        styles
            .iter()
            .map(|(target, style)| format!("{scope} [data-anim=\"{target}\"] {{ {style}; }}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn keys(&self) -> Vec<TrackKey> {
        self.timelines
            .iter()
            .enumerate()
            .flat_map(|(ti, t)| (0..t.tracks.len()).map(move |i| (ti, i)))
            .collect()
    }

    fn track(&self, key: TrackKey) -> &Track {
        &self.timelines[key.0].tracks[key.1]
    }
}

/// Trim float noise for CSS output.
fn round(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
