//! OpenGL present path: uploads the software pixel surface as a texture each
//! frame and draws it as an aspect-fit fullscreen quad.

use glow::{HasContext, PixelUnpackData, UniformLocation};
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextAttributesBuilder, PossiblyCurrentContext},
    display::{Display, DisplayApiPreference},
    prelude::*,
    surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};
use image::RgbaImage;
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::{error::Error, ffi::CStr, mem, num::NonZeroU32, sync::Arc};
use winit::window::Window;

pub struct State {
    gl: glow::Context,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    program: glow::Program,
    texture: glow::Texture,
    texture_location: UniformLocation,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ibo: glow::Buffer,
    index_count: i32,
    window_size: (u32, u32),
    frame_size: (u32, u32),
}

pub fn init(
    window: Arc<Window>,
    frame_width: u32,
    frame_height: u32,
    vsync_enabled: bool,
) -> Result<State, Box<dyn Error>> {
    info!("Initializing OpenGL present path...");

    let (gl_surface, gl_context, gl) = create_gl_context(&window, vsync_enabled)?;
    let (program, texture_location) = create_present_program(&gl)?;

    // One fullscreen quad; v is flipped because image row 0 is the top.
    let (vao, vbo, ibo, index_count) = unsafe {
        const QUAD_VERTICES: [[f32; 4]; 4] = [
            [-1.0, -1.0, 0.0, 1.0],
            [1.0, -1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0, 0.0],
        ];
        const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer()?;
        let ibo = gl.create_buffer()?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            cast::bytes_of(&QUAD_VERTICES),
            glow::STATIC_DRAW,
        );
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            cast::bytes_of(&QUAD_INDICES),
            glow::STATIC_DRAW,
        );

        let stride = (4 * mem::size_of::<f32>()) as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(
            1,
            2,
            glow::FLOAT,
            false,
            stride,
            (2 * mem::size_of::<f32>()) as i32,
        );
        gl.bind_vertex_array(None);

        (vao, vbo, ibo, QUAD_INDICES.len() as i32)
    };

    // Persistent texture at the fixed frame size; frames update it in place.
    let texture = unsafe {
        let texture = gl.create_texture()?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA as i32,
            frame_width as i32,
            frame_height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(None),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        texture
    };

    let initial_size = window.inner_size();
    let state = State {
        gl,
        gl_surface,
        gl_context,
        program,
        texture,
        texture_location,
        vao,
        vbo,
        ibo,
        index_count,
        window_size: (initial_size.width, initial_size.height),
        frame_size: (frame_width, frame_height),
    };

    info!("OpenGL present path initialized.");
    Ok(state)
}

/// Uploads `frame` and draws it letterboxed into the window.
pub fn present(state: &mut State, frame: &RgbaImage) -> Result<(), Box<dyn Error>> {
    let (win_w, win_h) = state.window_size;
    if win_w == 0 || win_h == 0 {
        return Ok(());
    }

    let (vx, vy, vw, vh) = fit_viewport(win_w, win_h, state.frame_size.0, state.frame_size.1);
    unsafe {
        state.gl.viewport(0, 0, win_w as i32, win_h as i32);
        state.gl.clear_color(0.0, 0.0, 0.0, 1.0);
        state.gl.clear(glow::COLOR_BUFFER_BIT);

        state.gl.use_program(Some(state.program));
        state.gl.active_texture(glow::TEXTURE0);
        state.gl.uniform_1_i32(Some(&state.texture_location), 0);
        state.gl.bind_texture(glow::TEXTURE_2D, Some(state.texture));
        state.gl.tex_sub_image_2d(
            glow::TEXTURE_2D,
            0,
            0,
            0,
            frame.width() as i32,
            frame.height() as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(frame.as_raw().as_slice())),
        );

        state.gl.viewport(vx, vy, vw, vh);
        state.gl.bind_vertex_array(Some(state.vao));
        state
            .gl
            .draw_elements(glow::TRIANGLES, state.index_count, glow::UNSIGNED_SHORT, 0);
        state.gl.bind_vertex_array(None);
        state.gl.bind_texture(glow::TEXTURE_2D, None);
    }
    state.gl_surface.swap_buffers(&state.gl_context)?;
    Ok(())
}

pub fn resize(state: &mut State, width: u32, height: u32) {
    if width > 0 && height > 0 {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            state.gl_surface.resize(&state.gl_context, w, h);
            state.window_size = (width, height);
        }
    } else {
        warn!("Ignoring resize to zero dimensions.");
    }
}

pub fn cleanup(state: &mut State) {
    info!("Cleaning up OpenGL resources...");
    unsafe {
        state.gl.delete_texture(state.texture);
        state.gl.delete_program(state.program);
        state.gl.delete_vertex_array(state.vao);
        state.gl.delete_buffer(state.vbo);
        state.gl.delete_buffer(state.ibo);
    }
}

/// Largest centered viewport that preserves the frame's aspect ratio.
fn fit_viewport(win_w: u32, win_h: u32, frame_w: u32, frame_h: u32) -> (i32, i32, i32, i32) {
    let win_aspect = win_w as f32 / win_h as f32;
    let frame_aspect = frame_w as f32 / frame_h as f32;
    let (vw, vh) = if win_aspect >= frame_aspect {
        ((win_h as f32 * frame_aspect).round() as i32, win_h as i32)
    } else {
        (win_w as i32, (win_w as f32 / frame_aspect).round() as i32)
    };
    (
        (win_w as i32 - vw) / 2,
        (win_h as i32 - vh) / 2,
        vw,
        vh,
    )
}

fn create_gl_context(
    window: &Window,
    vsync_enabled: bool,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext, glow::Context), Box<dyn Error>> {
    let display_handle = window.display_handle()?.as_raw();

    #[cfg(target_os = "windows")]
    let preference = DisplayApiPreference::Wgl(None);
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let preference = DisplayApiPreference::Egl;

    let display = unsafe { Display::new(display_handle, preference)? };

    let template = ConfigTemplateBuilder::new().with_alpha_size(8).build();
    let config = unsafe { display.find_configs(template)?.next() }
        .ok_or("Failed to find a suitable GL config")?;

    let (width, height): (u32, u32) = window.inner_size().into();
    let raw_window_handle = window.window_handle()?.as_raw();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(width.max(1)).ok_or("zero window width")?,
        NonZeroU32::new(height.max(1)).ok_or("zero window height")?,
    );
    let surface = unsafe { display.create_window_surface(&config, &surface_attributes)? };

    let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window_handle));
    let context = unsafe { display.create_context(&config, &context_attributes)? }
        .make_current(&surface)?;

    let interval = if vsync_enabled {
        SwapInterval::Wait(NonZeroU32::new(1).ok_or("bad swap interval")?)
    } else {
        SwapInterval::DontWait
    };
    if let Err(e) = surface.set_swap_interval(&context, interval) {
        warn!("Failed to set swap interval: {e}. VSync state may not be as requested.");
    } else {
        info!("VSync {}", if vsync_enabled { "on" } else { "off" });
    }

    let gl =
        unsafe { glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s)) };
    Ok((surface, context, gl))
}

fn create_present_program(
    gl: &glow::Context,
) -> Result<(glow::Program, UniformLocation), String> {
    unsafe {
        let program = gl.create_program()?;
        let shader_sources = [
            (glow::VERTEX_SHADER, include_str!("../shaders/present.vert")),
            (
                glow::FRAGMENT_SHADER,
                include_str!("../shaders/present.frag"),
            ),
        ];

        let mut shaders = Vec::with_capacity(shader_sources.len());
        for (shader_type, shader_source) in shader_sources.iter() {
            let shader = gl.create_shader(*shader_type)?;
            gl.shader_source(shader, shader_source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                return Err(gl.get_shader_info_log(shader));
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            return Err(gl.get_program_info_log(program));
        }
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        let texture_location = gl
            .get_uniform_location(program, "u_texture")
            .ok_or("Could not find 'u_texture' uniform")?;
        Ok((program, texture_location))
    }
}

mod cast {
    /// &[[f32; 4]] / &[u16] -> &[u8] for buffer uploads. Always valid since
    /// u8 alignment is 1 and we only narrow.
    #[inline(always)]
    pub fn bytes_of<T>(slice: &[T]) -> &[u8] {
        let (prefix, mid, suffix) = unsafe { slice.align_to::<u8>() };
        debug_assert!(prefix.is_empty() && suffix.is_empty());
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::fit_viewport;

    #[test]
    fn wide_window_pillarboxes() {
        let (x, y, w, h) = fit_viewport(1920, 540, 960, 540);
        assert_eq!((y, h), (0, 540));
        assert_eq!(w, 960);
        assert_eq!(x, 480);
    }

    #[test]
    fn tall_window_letterboxes() {
        let (x, y, w, h) = fit_viewport(960, 1080, 960, 540);
        assert_eq!((x, w), (0, 960));
        assert_eq!(h, 540);
        assert_eq!(y, 270);
    }

    #[test]
    fn exact_fit_fills_the_window() {
        assert_eq!(fit_viewport(960, 540, 960, 540), (0, 0, 960, 540));
    }
}
