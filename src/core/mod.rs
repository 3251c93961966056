pub mod canvas;
pub mod curve;
pub mod gfx;
pub mod scene;
pub mod sched;
