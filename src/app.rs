use crate::anim::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::core::canvas::PixelSurface;
use crate::core::gfx;
use crate::screens::{canvas, vector, Screen as CurrentScreen, ScreenAction};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use log::{error, info};
use std::{error::Error, sync::Arc, time::Instant};

pub struct App {
    window: Option<Arc<Window>>,
    backend: Option<gfx::State>,
    current_screen: CurrentScreen,
    canvas_state: canvas::State,
    vector_state: vector::State,
    // Backing store the vector screen's scene tree is rasterized into.
    vector_surface: PixelSurface,
    window_focused: bool,
    update_rate_hz: u32,
    vsync_enabled: bool,
    fullscreen_enabled: bool,
    display_width: u32,
    display_height: u32,
    frame_count: u32,
    last_title_update: Instant,
}

impl App {
    fn new(
        start_screen: CurrentScreen,
        update_rate_hz: u32,
        vsync_enabled: bool,
        fullscreen_enabled: bool,
        display_width: u32,
        display_height: u32,
    ) -> Self {
        Self {
            window: None,
            backend: None,
            current_screen: start_screen,
            canvas_state: canvas::init(),
            vector_state: vector::init(update_rate_hz),
            vector_surface: PixelSurface::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            window_focused: true,
            update_rate_hz,
            vsync_enabled,
            fullscreen_enabled,
            display_width,
            display_height,
            frame_count: 0,
            last_title_update: Instant::now(),
        }
    }

    fn handle_action(&mut self, action: ScreenAction, event_loop: &ActiveEventLoop) {
        match action {
            ScreenAction::Navigate(screen) => {
                if screen == self.current_screen {
                    return;
                }
                info!("Navigating {:?} -> {:?}", self.current_screen, screen);
                // Leaving a screen unmounts it: its loops are canceled and
                // its state dropped; entering goes through a fresh init.
                match self.current_screen {
                    CurrentScreen::Canvas => canvas::teardown(&mut self.canvas_state),
                    CurrentScreen::Vector => vector::teardown(&mut self.vector_state),
                }
                match screen {
                    CurrentScreen::Canvas => self.canvas_state = canvas::init(),
                    CurrentScreen::Vector => {
                        self.vector_state = vector::init(self.update_rate_hz);
                        vector::set_focused(&mut self.vector_state, self.window_focused);
                    }
                }
                self.current_screen = screen;
            }
            ScreenAction::Exit => {
                info!("Exit action received. Shutting down.");
                event_loop.exit();
            }
            ScreenAction::None => {}
        }
    }

    #[inline(always)]
    fn update_fps_title(&mut self, window: &Window, now: Instant) {
        self.frame_count += 1;
        let elapsed = now.duration_since(self.last_title_update);
        if elapsed.as_secs_f32() >= 1.0 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            window.set_title(&format!(
                "RideVis - {:?} | {:.2} FPS",
                self.current_screen, fps
            ));
            self.frame_count = 0;
            self.last_title_update = now;
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let mut window_attributes = Window::default_attributes()
            .with_title(format!("RideVis - {:?}", self.current_screen))
            .with_resizable(true);

        if self.fullscreen_enabled {
            let monitor = event_loop.primary_monitor();
            window_attributes = window_attributes
                .with_fullscreen(Some(winit::window::Fullscreen::Borderless(monitor)));
        } else {
            window_attributes = window_attributes
                .with_inner_size(PhysicalSize::new(self.display_width, self.display_height));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let backend = gfx::init(
            window.clone(),
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            self.vsync_enabled,
        )?;

        self.window = Some(window);
        self.backend = Some(backend);
        info!("Starting event loop...");
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window: &Window) {
        let now = Instant::now();

        match self.current_screen {
            CurrentScreen::Canvas => {
                canvas::attach_surface(&mut self.canvas_state, CANVAS_WIDTH, CANVAS_HEIGHT);
                let _ = canvas::tick(&mut self.canvas_state);
                if let (Some(backend), Some(surface)) =
                    (self.backend.as_mut(), canvas::surface(&self.canvas_state))
                {
                    if let Err(e) = gfx::present(backend, surface.image()) {
                        error!("Failed to present frame: {}", e);
                        event_loop.exit();
                        return;
                    }
                }
            }
            CurrentScreen::Vector => {
                let _ = vector::update_tick(&mut self.vector_state, now);
                let _ = vector::render_tick(&mut self.vector_state);
                if let Some(scene) = vector::scene(&self.vector_state) {
                    scene.rasterize(&mut self.vector_surface);
                    if let Some(backend) = self.backend.as_mut() {
                        if let Err(e) = gfx::present(backend, self.vector_surface.image()) {
                            error!("Failed to present frame: {}", e);
                            event_loop.exit();
                            return;
                        }
                    }
                }
            }
        }

        self.update_fps_title(window, now);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_graphics(event_loop) {
                error!("Failed to initialize graphics: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref().cloned() else {
            return;
        };
        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested. Shutting down.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(backend) = &mut self.backend {
                    gfx::resize(backend, new_size.width, new_size.height);
                }
            }
            WindowEvent::Focused(focused) => {
                self.window_focused = focused;
                if self.current_screen == CurrentScreen::Vector {
                    vector::set_focused(&mut self.vector_state, focused);
                }
            }
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                let action = match self.current_screen {
                    CurrentScreen::Canvas => {
                        canvas::handle_key_press(&mut self.canvas_state, &key_event)
                    }
                    CurrentScreen::Vector => {
                        vector::handle_key_press(&mut self.vector_state, &key_event)
                    }
                };
                self.handle_action(action, event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop, &window);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        canvas::teardown(&mut self.canvas_state);
        vector::teardown(&mut self.vector_state);
        if let Some(backend) = &mut self.backend {
            gfx::cleanup(backend);
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = crate::config::get();
    let start_screen = match config.start_screen.as_str() {
        "vector" => CurrentScreen::Vector,
        _ => CurrentScreen::Canvas,
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(
        start_screen,
        config.update_rate_hz,
        config.vsync,
        !config.windowed,
        config.display_width,
        config.display_height,
    );
    event_loop.run_app(&mut app)?;
    Ok(())
}
