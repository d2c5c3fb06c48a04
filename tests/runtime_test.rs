use cubes_demo::{
    InnerSpace, MouseButton, ElementState, PhysicalPosition, Vector3,
    context::Context,
    controls::ControlsConfig,
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        material::{Colour, Material},
        scene_graph::SceneNode,
        texture::LoadState,
    },
    dome::FALLBACK_COLOUR,
    editable::{EditorEvent, MemoryStore, StateStore, EditableState},
    error::{SceneError, SceneResult},
    flow::{FlowFuture, GraphicsFlow, Mutation, Out, Runtime},
    interaction::PointerEvent,
    render::Frame,
    scene::{
        BOX_GROUP_NAME, CAMERA_NAME, CUBE_ID, CubesFlow, DemoEvent, DemoState, connect_editor,
        demo_runtime,
    },
};
use instant::Duration;

use crate::common::test_utils::{
    STILL, config_with_texture, cube_on_screen, frame, frames_until, offline_config,
    started, started_in_memory, write_png,
};

mod common;

fn dome_material(frame: &Frame) -> Option<&Material> {
    frame
        .meshes
        .iter()
        .find(|mesh| matches!(mesh.geometry, Geometry::Sphere { .. }))
        .map(|mesh| &mesh.material)
}

#[test]
fn hover_and_click_change_the_next_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    let before = frame(&mut runtime);
    assert_eq!(
        before.mesh(CUBE_ID).unwrap().material,
        Material::Standard {
            colour: Colour::ORANGE
        }
    );

    let over_cube = cube_on_screen(&runtime);
    runtime.pointer_moved(over_cube);
    assert_eq!(runtime.hovered(), Some((0, CUBE_ID)));
    assert!(runtime.state().cube.hovered);

    runtime.mouse_input(MouseButton::Left, ElementState::Pressed);
    runtime.mouse_input(MouseButton::Left, ElementState::Released);
    assert!(runtime.state().cube.active);

    let after = frame(&mut runtime);
    let cube = after.mesh(CUBE_ID).unwrap();
    assert_eq!(
        cube.material,
        Material::Standard {
            colour: Colour::HOTPINK
        }
    );
    assert_eq!(cube.world.scale, Vector3::new(1.5, 1.5, 1.5));
}

#[test]
fn dragging_off_the_cube_is_not_a_click() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    frame(&mut runtime);

    runtime.pointer_moved(cube_on_screen(&runtime));
    runtime.mouse_input(MouseButton::Left, ElementState::Pressed);
    assert!(!runtime.state().cube.active);
    runtime.pointer_moved(PhysicalPosition::new(790.0, 590.0));
    runtime.mouse_input(MouseButton::Left, ElementState::Released);
    assert!(!runtime.state().cube.active);

    let after = frame(&mut runtime);
    assert_eq!(
        after.mesh(CUBE_ID).unwrap().world.scale,
        Vector3::new(1.0, 1.0, 1.0)
    );
}

#[test]
fn releasing_onto_the_cube_is_not_a_click() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    frame(&mut runtime);

    let over_cube = cube_on_screen(&runtime);
    runtime.pointer_moved(PhysicalPosition::new(790.0, 590.0));
    runtime.mouse_input(MouseButton::Left, ElementState::Pressed);
    runtime.pointer_moved(over_cube);
    runtime.mouse_input(MouseButton::Left, ElementState::Released);
    assert!(!runtime.state().cube.active);
    assert!(runtime.state().cube.hovered);
}

#[test]
fn leaving_the_cube_clears_hover() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    frame(&mut runtime);

    runtime.pointer_moved(cube_on_screen(&runtime));
    assert!(runtime.state().cube.hovered);
    runtime.pointer_moved(PhysicalPosition::new(790.0, 10.0));
    assert!(!runtime.state().cube.hovered);
    assert_eq!(runtime.hovered(), None);

    runtime.pointer_moved(cube_on_screen(&runtime));
    runtime.pointer_left();
    assert!(!runtime.state().cube.hovered);
}

#[test]
fn clicking_empty_space_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    frame(&mut runtime);

    runtime.pointer_moved(PhysicalPosition::new(790.0, 590.0));
    runtime.mouse_input(MouseButton::Left, ElementState::Pressed);
    runtime.mouse_input(MouseButton::Left, ElementState::Released);
    assert!(!runtime.state().cube.active);
    assert!(!runtime.state().cube.hovered);
}

#[test]
fn local_texture_resolves_without_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("dome.png");
    write_png(&png, 16, 8);
    let (mut runtime, _) = started_in_memory(&config_with_texture(dir.path(), &png.to_string_lossy()));

    let loaded = frames_until(&mut runtime, |state| state.dome.texture().texture().is_some());
    assert_eq!(loaded.suspended, 0);
    match dome_material(&loaded) {
        Some(Material::Basic { map: Some(map), .. }) => {
            assert_eq!((map.width, map.height), (16, 8));
        }
        other => panic!("Expected a textured dome, got {:?}", other),
    }
}

#[test]
fn file_url_textures_load() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("dome.png");
    write_png(&png, 4, 4);
    let url = format!("file://{}", png.to_string_lossy());
    let (mut runtime, _) = started_in_memory(&config_with_texture(dir.path(), &url));
    frames_until(&mut runtime, |state| !state.dome.texture().is_pending());
    assert!(runtime.state().dome.texture().texture().is_some());
}

#[test]
fn missing_texture_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    let frame = frames_until(&mut runtime, |state| {
        matches!(state.dome.texture().state(), LoadState::Failed(_))
    });
    assert!(matches!(
        runtime.state().dome.texture().state(),
        LoadState::Failed(reason) if reason.starts_with("failed to load texture") && reason.contains("missing.jpg")
    ));
    assert!(matches!(
        dome_material(&frame),
        Some(Material::Basic { colour, map: None, .. }) if *colour == FALLBACK_COLOUR
    ));
}

#[test]
fn editor_overrides_reach_the_frame_and_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, store) = started_in_memory(&offline_config(dir.path()));
    let mut editor = connect_editor(&mut runtime);

    let mut replayed = Vec::new();
    while let Some(EditorEvent::Registered { name, .. }) = editor.try_next_event() {
        replayed.push(name);
    }
    assert_eq!(replayed, vec!["Box1", "Camera1", "Spotlight1"]);

    editor
        .set_override(BOX_GROUP_NAME, Instance::at(0.0, 1.0, 0.0))
        .unwrap();
    let frame = frame(&mut runtime);
    assert_eq!(
        frame.mesh(CUBE_ID).unwrap().world.position,
        Vector3::new(-1.2, 1.0, 0.0)
    );
    assert_eq!(
        editor.try_next_event(),
        Some(EditorEvent::OverrideChanged {
            name: BOX_GROUP_NAME.to_string(),
            rendered: Instance::at(-1.2, 1.0, 0.0),
        })
    );
    let persisted = store.get("cubes-demo").unwrap();
    assert_eq!(
        persisted.transform(BOX_GROUP_NAME),
        Some(Instance::at(0.0, 1.0, 0.0))
    );
}

#[test]
fn unknown_editor_targets_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, store) = started_in_memory(&offline_config(dir.path()));
    let editor = connect_editor(&mut runtime);
    editor.set_override("Ghost", Instance::at(1.0, 1.0, 1.0)).unwrap();
    assert!(runtime.frame(STILL).is_ok());
    assert_eq!(store.get("cubes-demo"), None);
}

#[test]
fn camera_override_reseeds_the_orbit_camera() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    let editor = connect_editor(&mut runtime);
    editor
        .set_override(CAMERA_NAME, Instance::at(0.0, 0.0, 10.0))
        .unwrap();
    let frame = frame(&mut runtime);
    assert!((runtime.ctx().camera.camera.distance() - 10.0).abs() < 1e-4);
    assert!((frame.camera.world.position - Vector3::new(0.0, 0.0, 10.0)).magnitude() < 1e-4);
}

#[test]
fn persisted_camera_pose_is_restored_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    let mut store = MemoryStore::new();
    let mut state = EditableState::default();
    state.set(CAMERA_NAME, &Instance::at(0.0, 0.0, 8.0));
    store.save(&config.storage.namespace, &state).unwrap();

    let runtime = started(&config, Box::new(store));
    assert!((runtime.ctx().camera.camera.distance() - 8.0).abs() < 1e-5);
}

#[test]
fn auto_rotation_advances_with_frame_time() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _) = started_in_memory(&offline_config(dir.path()));
    let start = runtime.ctx().camera.camera.position;
    for _ in 0..10 {
        runtime.frame(Duration::from_millis(100)).unwrap();
    }
    let camera = &runtime.ctx().camera.camera;
    assert!((camera.position - start).magnitude() > 1e-3);
    assert!((camera.distance() - 5.0).abs() < 1e-3);
}

#[test]
fn duplicate_registration_fails_init() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    let ctx = Context::new(800, 600, ControlsConfig::default());
    let state = DemoState::new(&config, Box::new(MemoryStore::new())).unwrap();
    let mut runtime: Runtime<DemoState, DemoEvent> =
        Runtime::new(ctx, state, vec![Box::new(CubesFlow), Box::new(CubesFlow)]).unwrap();
    let err = runtime.init().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SceneError>(),
        Some(SceneError::DuplicateName(name)) if name == CAMERA_NAME
    ));
}

#[test]
fn exit_ends_the_flows() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = demo_runtime(&offline_config(dir.path()), Box::new(MemoryStore::new())).unwrap();
    runtime.init().unwrap();
    runtime.event_sender().exit().unwrap();
    frame(&mut runtime);
    assert!(runtime.exit_requested());

    runtime.shutdown();
    assert!(runtime.state().registry.names().next().is_none());
    assert!(!runtime.state().dome.is_mounted());
}

/// Counts frames and applies a deferred mutation resolved on the async runtime.
struct Counter;

impl GraphicsFlow<u32, ()> for Counter {
    fn on_init(&mut self, _: &mut Context, _: &mut u32) -> anyhow::Result<Out<u32, ()>> {
        let mutation: FlowFuture<Mutation<u32>> = Box::pin(async {
            let add: Mutation<u32> = Box::new(|count: &mut u32| *count += 100);
            add
        });
        Ok(Out::FutFn(vec![mutation]))
    }

    fn on_pointer(&mut self, _: &Context, _: &mut u32, _: u32, _: PointerEvent) -> Out<u32, ()> {
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, count: &mut u32, _: Duration) -> Out<u32, ()> {
        *count += 1;
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut u32, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render(&self, _: &Context, _: &u32) -> SceneResult<SceneNode> {
        Ok(SceneNode::group())
    }
}

#[test]
fn deferred_mutations_apply_between_frames() {
    let ctx = Context::new(800, 600, ControlsConfig::default());
    let mut runtime: Runtime<u32, ()> = Runtime::new(ctx, 0_u32, vec![Box::new(Counter)]).unwrap();
    runtime.init().unwrap();
    for _ in 0..500 {
        let _ = runtime.frame(STILL);
        if *runtime.state() >= 100 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert!(*runtime.state() > 100);
}

#[test]
fn frames_without_a_default_camera_fail() {
    let ctx = Context::new(800, 600, ControlsConfig::default());
    let mut runtime: Runtime<u32, ()> = Runtime::new(ctx, 0_u32, vec![Box::new(Counter)]).unwrap();
    runtime.init().unwrap();
    assert!(matches!(
        runtime.frame(STILL),
        Err(SceneError::DefaultCamera { found: 0 })
    ));
    assert!(runtime.last_frame().is_none());
}
