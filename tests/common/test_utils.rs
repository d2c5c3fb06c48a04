#![allow(dead_code)]

use std::path::Path;

use cubes_demo::{
    PhysicalPosition,
    config::Config,
    editable::{MemoryStore, StateStore},
    flow::Runtime,
    render::Frame,
    scene::{CUBE_ID, DemoEvent, DemoState, demo_runtime},
};
use instant::Duration;

/// Frames advance without wall time so auto-rotation stays put.
pub(crate) const STILL: Duration = Duration::ZERO;

/// Config whose dome loads `texture` and whose file store lives in `dir`.
pub(crate) fn config_with_texture(dir: &Path, texture: &str) -> Config {
    let mut config = Config::default();
    config.window.width = 800;
    config.window.height = 600;
    config.storage.dir = dir.join("state");
    config.dome.texture_url = texture.to_string();
    config
}

/// Config whose dome points at a file that does not exist.
pub(crate) fn offline_config(dir: &Path) -> Config {
    let missing = dir.join("missing.jpg");
    config_with_texture(dir, &missing.to_string_lossy())
}

pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]));
    img.save(path).expect("Failed to write test texture");
}

pub(crate) fn started(config: &Config, store: Box<dyn StateStore>) -> Runtime<DemoState, DemoEvent> {
    let mut runtime = demo_runtime(config, store).expect("Failed to build the demo runtime");
    runtime.init().expect("Failed to initialize the demo");
    runtime
}

pub(crate) fn started_in_memory(config: &Config) -> (Runtime<DemoState, DemoEvent>, MemoryStore) {
    let store = MemoryStore::new();
    (started(config, Box::new(store.clone())), store)
}

pub(crate) fn frame(runtime: &mut Runtime<DemoState, DemoEvent>) -> Frame {
    runtime.frame(STILL).expect("Frame failed to compose").clone()
}

/// Run frames until `done` holds, sleeping between them so spawned work can progress.
pub(crate) fn frames_until(
    runtime: &mut Runtime<DemoState, DemoEvent>,
    done: impl Fn(&DemoState) -> bool,
) -> Frame {
    for _ in 0..500 {
        let frame = frame(runtime);
        if done(runtime.state()) {
            return frame;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    panic!("Condition not reached within 500 frames");
}

/// Pixel under which the centre of the cube appears in the last frame.
pub(crate) fn cube_on_screen(runtime: &Runtime<DemoState, DemoEvent>) -> PhysicalPosition<f64> {
    let ctx = runtime.ctx();
    let frame = runtime.last_frame().expect("No frame composed yet");
    let cube = frame.mesh(CUBE_ID).expect("Cube missing from frame");
    let centre = cgmath::Point3::new(cube.world.position.x, cube.world.position.y, cube.world.position.z);
    ctx.camera
        .camera
        .world_to_screen(
            centre,
            ctx.size.width as f32,
            ctx.size.height as f32,
            &ctx.projection,
        )
        .expect("Cube is behind the camera")
}
