//! The cubes demo scene.
//!
//! One flow, [`CubesFlow`], owns the whole scene: an editable default camera,
//! an ambient, a spot and a point light, an editable group holding the
//! interactive cube and a group with the background dome. The scene tree is
//! recomputed from [`DemoState`] every frame by [`compose`].

use cgmath::Deg;
use futures::{StreamExt, channel::mpsc::UnboundedReceiver};
use instant::Duration;

use crate::{
    camera::Camera,
    config::Config,
    context::Context,
    data_structures::{
        instance::Instance,
        material::Colour,
        scene_graph::{NodeKind, SceneNode, validate_default_camera},
        texture::Texture,
    },
    dome::Dome,
    editable::{EditableKind, EditableRegistry, EditableState, EditorCommand, EditorEvent, StateStore},
    error::{SceneError, SceneResult},
    flow::{self, EventSender, FlowFuture, GraphicsFlow, Out, Runtime},
    interaction::{Interactive, PointerEvent},
    render::LogPresenter,
    resources,
};

pub const CAMERA_NAME: &str = "Camera1";
pub const SPOTLIGHT_NAME: &str = "Spotlight1";
pub const BOX_GROUP_NAME: &str = "Box1";
/// Pick id of the interactive cube.
pub const CUBE_ID: u32 = 1;

pub const CAMERA_FOV: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;

pub fn spotlight_base() -> Instance {
    Instance::at(10.0, 10.0, 10.0)
}

pub fn box_group_base() -> Instance {
    Instance::at(-1.2, 0.0, 0.0)
}

pub fn point_light_position() -> Instance {
    Instance::at(-10.0, -10.0, -10.0)
}

#[derive(Debug)]
pub struct DemoState {
    pub cube: Interactive,
    pub dome: Dome,
    pub registry: EditableRegistry,
    /// Camera pose set by the editor, applied to the orbit camera on the next update.
    camera_seed: Option<Instance>,
}

impl DemoState {
    /// Fresh state whose editable overrides come from the bundled snapshot and `store`.
    pub fn new(config: &Config, store: Box<dyn StateStore>) -> SceneResult<Self> {
        let registry = EditableRegistry::new(
            config.storage.namespace.clone(),
            EditableState::initial()?,
            store,
        )?;
        Ok(Self {
            cube: Interactive::default(),
            dome: Dome::new(&config.dome),
            registry,
            camera_seed: None,
        })
    }
}

#[derive(Debug)]
pub enum DemoEvent {
    Editor(EditorCommand),
    TextureLoaded {
        generation: u64,
        result: SceneResult<Texture>,
    },
}

fn load_dome(url: String, generation: u64) -> FlowFuture<DemoEvent> {
    Box::pin(async move {
        let result = resources::load_texture(&url)
            .await
            .map_err(|e| SceneError::Texture {
                reason: format!("{:#}", e),
                url,
            });
        DemoEvent::TextureLoaded { generation, result }
    })
}

/// The scene tree for the current state, viewed through `camera`.
pub fn compose(state: &DemoState, camera: &Camera) -> SceneResult<SceneNode> {
    let rendered = |name: &str, base: Instance| state.registry.rendered_transform(name).unwrap_or(base);

    let root = SceneNode::group().with_children([
        SceneNode::new(NodeKind::PerspectiveCamera {
            fov: CAMERA_FOV,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            is_default: true,
        })
        .named(CAMERA_NAME)
        .with_transform(camera.to_instance()),
        SceneNode::new(NodeKind::AmbientLight {
            intensity: 0.5,
            colour: Colour::WHITE,
        }),
        SceneNode::new(NodeKind::SpotLight {
            intensity: 1.0,
            angle: 0.15,
            penumbra: 1.0,
            colour: Colour::WHITE,
        })
        .named(SPOTLIGHT_NAME)
        .with_transform(rendered(SPOTLIGHT_NAME, spotlight_base())),
        SceneNode::new(NodeKind::PointLight {
            intensity: 1.0,
            colour: Colour::WHITE,
        })
        .with_transform(point_light_position()),
        SceneNode::group()
            .named(BOX_GROUP_NAME)
            .with_transform(rendered(BOX_GROUP_NAME, box_group_base()))
            .with_child(state.cube.render(CUBE_ID)),
        SceneNode::group().with_children(state.dome.render()),
    ]);
    validate_default_camera([&root])?;
    Ok(root)
}

#[derive(Debug, Default)]
pub struct CubesFlow;

impl GraphicsFlow<DemoState, DemoEvent> for CubesFlow {
    fn on_init(&mut self, ctx: &mut Context, state: &mut DemoState) -> anyhow::Result<Out<DemoState, DemoEvent>> {
        let camera = state
            .registry
            .register(CAMERA_NAME, EditableKind::PerspectiveCamera, Instance::new())?;
        state
            .registry
            .register(SPOTLIGHT_NAME, EditableKind::SpotLight, spotlight_base())?;
        state
            .registry
            .register(BOX_GROUP_NAME, EditableKind::Group, box_group_base())?;

        ctx.camera.camera.seed(&camera);
        ctx.projection.set_fovy(Deg(CAMERA_FOV));
        ctx.projection.set_clipping(CAMERA_NEAR, CAMERA_FAR);

        let generation = state.dome.mount();
        Ok(Out::FutEvent(vec![load_dome(
            state.dome.url().to_string(),
            generation,
        )]))
    }

    fn on_pointer(&mut self, _: &Context, state: &mut DemoState, id: u32, event: PointerEvent) -> Out<DemoState, DemoEvent> {
        if id == CUBE_ID {
            state.cube.handle(event);
            log::trace!("Cube {:?}: hovered={} active={}", event, state.cube.hovered, state.cube.active);
        }
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, state: &mut DemoState, _: Duration) -> Out<DemoState, DemoEvent> {
        match state.camera_seed.take() {
            Some(seed) => Out::Configure(Box::new(move |ctx: &mut Context| {
                ctx.camera.camera.seed(&seed);
            })),
            None => Out::Empty,
        }
    }

    fn on_custom_events(&mut self, _: &Context, state: &mut DemoState, event: DemoEvent) -> Option<DemoEvent> {
        match event {
            DemoEvent::Editor(command) => {
                let name = command.name().to_string();
                if let Err(e) = state.registry.apply(command) {
                    log::error!("Editor command for `{}` failed: {}", name, e);
                }
                if name == CAMERA_NAME {
                    state.camera_seed = state.registry.rendered_transform(CAMERA_NAME);
                }
            }
            DemoEvent::TextureLoaded { generation, result } => {
                state.dome.resolve(generation, result);
            }
        }
        None
    }

    fn on_render(&self, ctx: &Context, state: &DemoState) -> SceneResult<SceneNode> {
        compose(state, &ctx.camera.camera)
    }

    fn on_exit(&mut self, _: &Context, state: &mut DemoState) {
        for name in [CAMERA_NAME, SPOTLIGHT_NAME, BOX_GROUP_NAME] {
            state.registry.deregister(name);
        }
        state.dome.unmount();
    }
}

/// The editor's end of the connection to a running demo.
pub struct EditorLink {
    events: UnboundedReceiver<EditorEvent>,
    sender: EventSender<DemoState, DemoEvent>,
}

impl EditorLink {
    pub fn set_override(&self, name: impl Into<String>, transform: Instance) -> SceneResult<()> {
        self.sender.send(DemoEvent::Editor(EditorCommand::SetOverride {
            name: name.into(),
            transform,
        }))
    }

    pub fn clear_override(&self, name: impl Into<String>) -> SceneResult<()> {
        self.sender
            .send(DemoEvent::Editor(EditorCommand::ClearOverride { name: name.into() }))
    }

    /// The next event if one is queued.
    pub fn try_next_event(&mut self) -> Option<EditorEvent> {
        self.events.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<EditorEvent> {
        self.events.next().await
    }
}

/// Attach an editor to the demo running in `runtime`.
pub fn connect_editor(runtime: &mut Runtime<DemoState, DemoEvent>) -> EditorLink {
    let events = runtime.state_mut().registry.connect_editor();
    EditorLink {
        events,
        sender: runtime.event_sender(),
    }
}

/// The file store configured under `[storage]`.
#[cfg(not(target_arch = "wasm32"))]
pub fn default_store(config: &Config) -> SceneResult<Box<dyn StateStore>> {
    Ok(Box::new(crate::editable::FileStore::new(config.storage.dir.clone())))
}

/// The browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
pub fn default_store(_config: &Config) -> SceneResult<Box<dyn StateStore>> {
    Ok(Box::new(crate::editable::store::LocalStorage::new()?))
}

/// An uninitialized runtime running the demo.
pub fn demo_runtime(config: &Config, store: Box<dyn StateStore>) -> anyhow::Result<Runtime<DemoState, DemoEvent>> {
    let ctx = Context::new(config.window.width, config.window.height, config.controls.clone());
    let state = DemoState::new(config, store)?;
    Runtime::new(ctx, state, vec![Box::new(CubesFlow)])
}

pub fn run_demo(config: Config) -> anyhow::Result<()> {
    flow::run(
        config.window.clone(),
        move || demo_runtime(&config, default_store(&config)?),
        LogPresenter::new(),
    )
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run_demo(Config::default()).map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
