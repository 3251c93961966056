// src/screens/canvas.rs
//! Imperative canvas screen: draws every frame directly onto a pixel
//! surface, redrawn once per display refresh. The surface may lag behind
//! the screen (platform recreation); those ticks skip drawing silently but
//! the animation keeps advancing and the loop stays scheduled.

use crate::anim::{style, AnimationHandle, FrameComputer, FrameData};
use crate::core::canvas::PixelSurface;
use crate::core::curve;
use crate::core::sched::FrameLoop;
use crate::screens::{Screen, ScreenAction};
use log::debug;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

const SMOOTH_STEP_PX: f32 = 3.0;

pub struct State {
    model: AnimationHandle,
    surface: Option<PixelSurface>,
    frame_loop: FrameLoop,
}

pub fn init() -> State {
    State {
        model: AnimationHandle::new(),
        surface: None,
        frame_loop: FrameLoop::new(),
    }
}

/// Idempotent surface acquisition: the first call attaches, later calls are
/// no-ops even if the requested size differs.
pub fn attach_surface(state: &mut State, width: u32, height: u32) {
    if state.surface.is_some() {
        return;
    }
    debug!("Canvas screen: attaching {}x{} surface", width, height);
    state.surface = Some(PixelSurface::new(width, height));
}

pub fn surface(state: &State) -> Option<&PixelSurface> {
    state.surface.as_ref()
}

pub fn model(state: &State) -> &AnimationHandle {
    &state.model
}

/// One display-refresh tick: draw if a surface is attached, then advance the
/// animation, then re-arm unless torn down. Returns whether the loop is
/// still scheduled.
pub fn tick(state: &mut State) -> bool {
    let State {
        model,
        surface,
        frame_loop,
    } = state;
    frame_loop.run_tick(|| {
        if let Some(surface) = surface.as_mut() {
            draw_frame(surface, &model.frame_data());
        }
        model.advance();
    })
}

pub fn teardown(state: &mut State) {
    state.frame_loop.cancel();
}

pub fn handle_key_press(_state: &mut State, event: &KeyEvent) -> ScreenAction {
    if event.state != ElementState::Pressed {
        return ScreenAction::None;
    }
    match event.physical_key {
        PhysicalKey::Code(KeyCode::Tab) | PhysicalKey::Code(KeyCode::ArrowRight) => {
            ScreenAction::Navigate(Screen::Vector)
        }
        PhysicalKey::Code(KeyCode::Escape) => ScreenAction::Exit,
        _ => ScreenAction::None,
    }
}

/// Later draws occlude earlier ones where they overlap: track band first,
/// then the window strokes, then the point circles on top.
fn draw_frame(surface: &mut PixelSurface, frame: &FrameData) {
    surface.clear(style::CLEAR);
    surface.with_offset(-frame.translate_x, style::SCENE_Y_OFFSET, |s| {
        s.stroke_polyline(
            &curve::sample(&frame.track, SMOOTH_STEP_PX),
            style::TRACK_STROKE_WIDTH,
            style::TRACK,
        );
        s.stroke_polyline(
            &curve::sample(&frame.right_window, SMOOTH_STEP_PX),
            style::WINDOW_STROKE_WIDTH,
            style::RIGHT,
        );
        s.stroke_polyline(
            &curve::sample(&frame.left_window, SMOOTH_STEP_PX),
            style::WINDOW_STROKE_WIDTH,
            style::LEFT,
        );

        s.fill_circle(frame.track_point, style::POINT_RADIUS, style::POINT_FILL);

        s.fill_circle(frame.right_point, style::POINT_RADIUS, style::RIDER_FILL);
        s.stroke_circle(
            frame.right_point,
            style::POINT_RADIUS,
            style::RIDER_STROKE_WIDTH,
            style::RIGHT,
        );
        s.fill_circle(frame.left_point, style::POINT_RADIUS, style::RIDER_FILL);
        s.stroke_circle(
            frame.left_point,
            style::POINT_RADIUS,
            style::RIDER_STROKE_WIDTH,
            style::LEFT,
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{CANVAS_HEIGHT, CANVAS_WIDTH};

    #[test]
    fn tick_without_surface_advances_state_and_stays_scheduled() {
        let mut state = init();
        let before = model(&state).state().tick;
        assert!(tick(&mut state));
        assert_eq!(model(&state).state().tick, before + 1);
        assert!(surface(&state).is_none());
    }

    #[test]
    fn attach_is_idempotent() {
        let mut state = init();
        attach_surface(&mut state, 100, 50);
        attach_surface(&mut state, 640, 480);
        let s = surface(&state).unwrap();
        assert_eq!((s.width(), s.height()), (100, 50));
    }

    #[test]
    fn tick_with_surface_draws_the_frame() {
        let mut state = init();
        attach_surface(&mut state, CANVAS_WIDTH, CANVAS_HEIGHT);
        assert!(tick(&mut state));
        let s = surface(&state).unwrap();
        // Something other than the clear color landed on screen.
        let drawn = (0..s.height())
            .flat_map(|y| (0..s.width()).map(move |x| (x, y)))
            .any(|(x, y)| s.pixel(x, y) != style::CLEAR);
        assert!(drawn);
    }

    #[test]
    fn teardown_stops_rescheduling_and_freezes_state() {
        let mut state = init();
        assert!(tick(&mut state));
        teardown(&mut state);
        let frozen = model(&state).state().clone();
        assert!(!tick(&mut state));
        assert!(!tick(&mut state));
        assert_eq!(*model(&state).state(), frozen);
    }

    #[test]
    fn identical_states_draw_identical_frames() {
        let mut a = init();
        let mut b = init();
        attach_surface(&mut a, 320, 180);
        attach_surface(&mut b, 320, 180);
        tick(&mut a);
        tick(&mut b);
        let (sa, sb) = (surface(&a).unwrap(), surface(&b).unwrap());
        for y in 0..sa.height() {
            for x in 0..sa.width() {
                assert_eq!(sa.pixel(x, y), sb.pixel(x, y));
            }
        }
    }
}
