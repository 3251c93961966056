//! Mock ride animation: a deterministic time-series of two riders weaving
//! along a noise-generated track. Pure state -> geometry, no side effects;
//! both rendering screens drive it through [`FrameComputer`].

use crate::core::curve;
use cgmath::Vector2;

pub type Point = Vector2<f32>;

// Scene dimensions shared by both screens.
pub const CANVAS_WIDTH: u32 = 960;
pub const CANVAS_HEIGHT: u32 = 540;

// One update tick advances the ride by one sample.
const STEP_X: f32 = 12.0;
const PHASE_STEP: f32 = 0.18;

// Sliding window of samples kept behind each rider.
pub const TRAIL_LEN: usize = 48;

// Screen-space x where the rider heads sit (the scroll offset keeps it fixed).
const HEAD_SCREEN_X: f32 = 620.0;

// Track synthesis: value-noise control points every CTRL_TICKS samples,
// smoothed with the monotone curve the screens also stroke with.
const CTRL_TICKS: i64 = 11;
const CTRL_SPACING: f32 = CTRL_TICKS as f32 * STEP_X;
const TRACK_MID_Y: f32 = 230.0;
const TRACK_AMPLITUDE: f32 = 110.0;
const TRACK_MARGIN: f32 = 2.0 * CTRL_SPACING;
const NOISE_SEED: u64 = 0x5249_4445;

// Rider weave around the track band.
const LEFT_WAVE_AMP: f32 = 26.0;
const RIGHT_WAVE_AMP: f32 = 34.0;
const RIGHT_WAVE_RATE: f32 = 0.71;
const RIGHT_WAVE_OFFSET: f32 = 1.7;

/// Shared styling for both screens, mirroring the track/rider roles.
pub mod style {
    pub const CLEAR: [u8; 4] = [0x08, 0x0a, 0x0c, 0xff];
    pub const TRACK: [u8; 4] = [0xc4, 0xc4, 0xc4, 0xff];
    pub const TRACK_TRANSLUCENT: [u8; 4] = [0xc4, 0xc4, 0xc4, 0xcc];
    pub const LEFT: [u8; 4] = [0x00, 0xb8, 0xcc, 0xff];
    pub const RIGHT: [u8; 4] = [0xff, 0x47, 0xb3, 0xff];
    pub const POINT_FILL: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
    pub const RIDER_FILL: [u8; 4] = [0x00, 0x00, 0x00, 0xff];

    pub const TRACK_STROKE_WIDTH: f32 = 20.0;
    pub const WINDOW_STROKE_WIDTH: f32 = 4.0;
    pub const RIDER_STROKE_WIDTH: f32 = 4.0;
    pub const POINT_RADIUS: f32 = 6.0;

    /// Vertical nudge applied to the whole scene group.
    pub const SCENE_Y_OFFSET: f32 = 40.0;
}

/// Evolving animation state. Owned by exactly one screen; merged in place
/// each update tick via [`AnimationState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    /// Sample cursor; the rider heads sit at this index.
    pub tick: i64,
    /// Phase cursor for the rider weave, kept in lockstep with `tick`.
    pub phase: f32,
    /// Horizontal scroll applied to the whole scene.
    pub translate_x: f32,
}

/// Next-tick field values produced by [`update_animation_state`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateDelta {
    pub tick: i64,
    pub phase: f32,
    pub translate_x: f32,
}

impl AnimationState {
    pub fn apply(&mut self, delta: StateDelta) {
        self.tick = delta.tick;
        self.phase = delta.phase;
        self.translate_x = delta.translate_x;
    }
}

/// Per-tick geometry snapshot, recomputed from scratch every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    pub left_point: Point,
    pub right_point: Point,
    pub track_point: Point,
    pub left_window: Vec<Point>,
    pub right_window: Vec<Point>,
    pub track: Vec<Point>,
    pub translate_x: f32,
}

pub fn initial_state() -> AnimationState {
    AnimationState {
        tick: 0,
        phase: 0.0,
        translate_x: 0.0,
    }
}

pub fn update_animation_state(state: &AnimationState) -> StateDelta {
    let next = state.tick + 1;
    // Recomputed from the cursor rather than accumulated, so the scroll
    // advances in exact pixel steps with no float drift.
    StateDelta {
        tick: next,
        phase: next as f32 * PHASE_STEP,
        translate_x: next as f32 * STEP_X,
    }
}

pub fn compute_frame_data(state: &AnimationState) -> FrameData {
    let head = state.tick;

    let mut left_window = Vec::with_capacity(TRAIL_LEN);
    let mut right_window = Vec::with_capacity(TRAIL_LEN);
    for i in (head - TRAIL_LEN as i64 + 1)..=head {
        left_window.push(Point::new(sample_x(i), left_height(state, i)));
        right_window.push(Point::new(sample_x(i), right_height(state, i)));
    }

    let left_point = left_window[left_window.len() - 1];
    let right_point = right_window[right_window.len() - 1];
    let track_point = Point::new(sample_x(head), track_height(head));

    FrameData {
        left_point,
        right_point,
        track_point,
        left_window,
        right_window,
        track: track_span(state.translate_x),
        translate_x: state.translate_x,
    }
}

/// Capability both screens drive the model through: one frame projection,
/// one state advance, each at the cadence the screen chooses.
pub trait FrameComputer {
    fn frame_data(&self) -> FrameData;
    fn advance(&mut self);
}

/// Owning handle around [`AnimationState`]; one per screen mount.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    state: AnimationState,
}

impl AnimationHandle {
    pub fn new() -> Self {
        Self {
            state: initial_state(),
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }
}

impl FrameComputer for AnimationHandle {
    fn frame_data(&self) -> FrameData {
        compute_frame_data(&self.state)
    }

    fn advance(&mut self) {
        let delta = update_animation_state(&self.state);
        self.state.apply(delta);
    }
}

fn sample_x(i: i64) -> f32 {
    HEAD_SCREEN_X + i as f32 * STEP_X
}

/// Uniform value noise in [0, 1) addressable by control-point index.
fn noise01(k: i64) -> f32 {
    let h = twox_hash::XxHash64::oneshot(NOISE_SEED, &k.to_le_bytes());
    (h >> 40) as f32 / (1u64 << 24) as f32
}

fn control_point(k: i64) -> Point {
    let y = TRACK_MID_Y + (noise01(k) * 2.0 - 1.0) * TRACK_AMPLITUDE;
    Point::new(HEAD_SCREEN_X + k as f32 * CTRL_SPACING, y)
}

/// Track height at a sample index, evaluated on the same monotone spline the
/// screens stroke, so the track point always sits on the drawn track.
fn track_height(i: i64) -> f32 {
    let k0 = i.div_euclid(CTRL_TICKS);
    let pts = [
        control_point(k0 - 1),
        control_point(k0),
        control_point(k0 + 1),
        control_point(k0 + 2),
    ];
    let m = curve::monotone_tangents(&pts);
    curve::hermite_y(pts[1], pts[2], m[1], m[2], sample_x(i))
}

fn weave_phase(state: &AnimationState, i: i64) -> f32 {
    state.phase - (state.tick - i) as f32 * PHASE_STEP
}

fn left_height(state: &AnimationState, i: i64) -> f32 {
    track_height(i) + LEFT_WAVE_AMP * weave_phase(state, i).sin()
}

fn right_height(state: &AnimationState, i: i64) -> f32 {
    let p = weave_phase(state, i) * RIGHT_WAVE_RATE + RIGHT_WAVE_OFFSET;
    track_height(i) + RIGHT_WAVE_AMP * p.sin()
}

/// Track control points covering the scrolled viewport plus margin, sparse
/// enough that the curve smoothing does the visual work.
fn track_span(translate_x: f32) -> Vec<Point> {
    let left = translate_x - TRACK_MARGIN;
    let right = translate_x + CANVAS_WIDTH as f32 + TRACK_MARGIN;
    let k_lo = ((left - HEAD_SCREEN_X) / CTRL_SPACING).floor() as i64 - 1;
    let k_hi = ((right - HEAD_SCREEN_X) / CTRL_SPACING).ceil() as i64 + 1;
    (k_lo..=k_hi).map(control_point).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticked(n: usize) -> AnimationState {
        let mut state = initial_state();
        for _ in 0..n {
            let delta = update_animation_state(&state);
            state.apply(delta);
        }
        state
    }

    #[test]
    fn compute_is_pure() {
        let state = ticked(17);
        assert_eq!(compute_frame_data(&state), compute_frame_data(&state));
    }

    #[test]
    fn update_does_not_mutate_input() {
        let state = ticked(5);
        let before = state.clone();
        let _ = update_animation_state(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn windows_are_bounded_and_sorted() {
        for n in [0, 1, 10, 500] {
            let frame = compute_frame_data(&ticked(n));
            for window in [&frame.left_window, &frame.right_window] {
                assert!(!window.is_empty());
                assert!(window.len() <= TRAIL_LEN);
                assert!(window.windows(2).all(|w| w[0].x < w[1].x));
            }
        }
    }

    #[test]
    fn scroll_advances_monotonically() {
        let mut state = initial_state();
        let mut last = state.translate_x;
        for _ in 0..1000 {
            state.apply(update_animation_state(&state));
            assert!(state.translate_x > last);
            last = state.translate_x;
        }
    }

    #[test]
    fn initial_states_are_independent() {
        let mut a = initial_state();
        let b = initial_state();
        assert_eq!(a, b);
        a.apply(update_animation_state(&a));
        assert_ne!(a, b);
        assert_eq!(b, initial_state());
    }

    #[test]
    fn fresh_state_renders_a_full_snapshot() {
        let frame = compute_frame_data(&initial_state());
        assert_eq!(frame.translate_x, 0.0);
        assert!(!frame.track.is_empty());
        assert_eq!(frame.left_window.len(), TRAIL_LEN);
        assert_eq!(frame.right_window.len(), TRAIL_LEN);
        for p in [frame.left_point, frame.right_point, frame.track_point] {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
        // Heads sit at the ends of their windows.
        assert_eq!(frame.left_point, *frame.left_window.last().unwrap());
        assert_eq!(frame.right_point, *frame.right_window.last().unwrap());
    }

    #[test]
    fn track_point_sits_on_the_smoothed_track() {
        let frame = compute_frame_data(&ticked(40));
        let dense = curve::sample(&frame.track, 1.0);
        let nearest = dense
            .iter()
            .min_by(|a, b| {
                let da = (a.x - frame.track_point.x).abs();
                let db = (b.x - frame.track_point.x).abs();
                da.partial_cmp(&db).unwrap()
            })
            .unwrap();
        assert!((nearest.y - frame.track_point.y).abs() < 2.0);
    }

    #[test]
    fn track_covers_the_viewport() {
        let state = ticked(300);
        let frame = compute_frame_data(&state);
        let first = frame.track.first().unwrap();
        let last = frame.track.last().unwrap();
        assert!(first.x <= state.translate_x);
        assert!(last.x >= state.translate_x + CANVAS_WIDTH as f32);
    }
}
