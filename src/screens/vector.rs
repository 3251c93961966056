// src/screens/vector.rs
//! Declarative vector screen: rebuilds a scene tree from fresh frame data
//! once per display refresh, while the animation advances on its own
//! fixed-period timer. Both loops gate identically on focus; losing focus
//! cancels them so no timer keeps mutating state invisibly.

use crate::anim::{style, AnimationHandle, FrameComputer, FrameData, Point};
use crate::core::sched::{FrameLoop, IntervalLoop};
use crate::core::scene::{Element, Scene, Stroke};
use crate::screens::{Screen, ScreenAction};
use log::debug;
use std::time::Instant;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub struct State {
    model: AnimationHandle,
    scene: Option<Scene>,
    render_loop: FrameLoop,
    update_loop: IntervalLoop,
    update_rate_hz: u32,
    focused: bool,
}

pub fn init(update_rate_hz: u32) -> State {
    State {
        model: AnimationHandle::new(),
        scene: None,
        render_loop: FrameLoop::new(),
        update_loop: IntervalLoop::from_rate_hz(update_rate_hz),
        update_rate_hz,
        focused: true,
    }
}

pub fn model(state: &State) -> &AnimationHandle {
    &state.model
}

/// Latest rendered scene tree, if a render tick has run since mount/focus.
pub fn scene(state: &State) -> Option<&Scene> {
    state.scene.as_ref()
}

pub fn is_focused(state: &State) -> bool {
    state.focused
}

/// Focus transitions tear down and re-create both loops, the same way an
/// effect re-runs when its dependency changes.
pub fn set_focused(state: &mut State, focused: bool) {
    if state.focused == focused {
        return;
    }
    debug!("Vector screen focus -> {}", focused);
    state.focused = focused;
    if focused {
        state.render_loop = FrameLoop::new();
        state.update_loop = IntervalLoop::from_rate_hz(state.update_rate_hz);
    } else {
        state.render_loop.cancel();
        state.update_loop.cancel();
    }
}

/// Once per display refresh: force a re-render of the current frame data.
/// Returns whether the render loop is still scheduled.
pub fn render_tick(state: &mut State) -> bool {
    let State {
        model,
        scene,
        render_loop,
        ..
    } = state;
    render_loop.run_tick(|| {
        *scene = Some(build_scene(&model.frame_data()));
    })
}

/// Fixed-period state advance, polled by the host each refresh.
pub fn update_tick(state: &mut State, now: Instant) -> bool {
    let State {
        model, update_loop, ..
    } = state;
    update_loop.poll(now, || model.advance())
}

pub fn teardown(state: &mut State) {
    state.render_loop.cancel();
    state.update_loop.cancel();
}

pub fn handle_key_press(_state: &mut State, event: &KeyEvent) -> ScreenAction {
    if event.state != ElementState::Pressed {
        return ScreenAction::None;
    }
    match event.physical_key {
        PhysicalKey::Code(KeyCode::Tab) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
            ScreenAction::Navigate(Screen::Canvas)
        }
        PhysicalKey::Code(KeyCode::Escape) => ScreenAction::Exit,
        _ => ScreenAction::None,
    }
}

fn build_scene(frame: &FrameData) -> Scene {
    Scene {
        clear_color: style::CLEAR,
        translate: Point::new(-frame.translate_x, style::SCENE_Y_OFFSET),
        elements: vec![
            Element::Path {
                points: frame.track.clone(),
                stroke: Stroke {
                    color: style::TRACK_TRANSLUCENT,
                    width: style::TRACK_STROKE_WIDTH,
                },
            },
            Element::Path {
                points: frame.left_window.clone(),
                stroke: Stroke {
                    color: style::LEFT,
                    width: style::WINDOW_STROKE_WIDTH,
                },
            },
            Element::Path {
                points: frame.right_window.clone(),
                stroke: Stroke {
                    color: style::RIGHT,
                    width: style::WINDOW_STROKE_WIDTH,
                },
            },
            Element::Circle {
                center: frame.track_point,
                radius: style::POINT_RADIUS,
                fill: Some(style::POINT_FILL),
                stroke: None,
            },
            Element::Circle {
                center: frame.left_point,
                radius: style::POINT_RADIUS,
                fill: Some(style::RIDER_FILL),
                stroke: Some(Stroke {
                    color: style::LEFT,
                    width: style::RIDER_STROKE_WIDTH,
                }),
            },
            Element::Circle {
                center: frame.right_point,
                radius: style::POINT_RADIUS,
                fill: Some(style::RIDER_FILL),
                stroke: Some(Stroke {
                    color: style::RIGHT,
                    width: style::RIDER_STROKE_WIDTH,
                }),
            },
        ],
    }
}
