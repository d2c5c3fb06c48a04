//! Flow control and application event loop.
//!
//! This module provides the host loop and the flow abstraction. A "flow" is a
//! unit of scene logic: it owns part of the scene, reacts to pointer input,
//! updates every frame and describes what it renders as a scene tree. The
//! [`Runtime`] drives all flows, headless or from a winit window via [`run`].
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scene logic
//! - [`Out<S, E>`] is the output type for async work and context configuration
//! - [`EventSender<S, E>`] injects custom events into the loop from anywhere
//!
//! # Lifecycle Flow
//!
//! Each frame the runtime:
//! 1. Drains events of resolved futures and sent from outside
//! 2. Advances the orbit controls
//! 3. Calls `on_update` on all flows
//! 4. Collects every flow's tree via `on_render`
//! 5. Validates and flattens the trees into a [`Frame`]
//!
//! Pointer input between frames is hit-tested against the last frame and
//! dispatched to the flow that rendered the hit mesh.

use std::{fmt::Debug, sync::Arc};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::WindowConfig,
    context::{CameraResources, Context},
    controls::wheel_steps,
    error::{SceneError, SceneResult},
    interaction::PointerEvent,
    data_structures::scene_graph::SceneNode,
    pick::pick,
    render::{Frame, Presenter},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// A future handed to the host loop. It must be `Send` on native targets,
/// where it runs on a tokio runtime.
#[cfg(not(target_arch = "wasm32"))]
pub type FlowFuture<T> = futures::future::BoxFuture<'static, T>;
#[cfg(target_arch = "wasm32")]
pub type FlowFuture<T> = futures::future::LocalBoxFuture<'static, T>;

/// A deferred mutation of the flow state.
pub type Mutation<S> = Box<dyn FnOnce(&mut S) + Send>;

///
/// This is the Output Type for every lifecycle hook where the flow can pass async work that is
/// handled according to the platform it's running on.
///
/// `Out::FutEvent` resolves futures of events that are put in the event queue once resolved. They
/// are handed to `on_custom_events` at the start of a later frame, never while the loop waits.
///
/// `Out::FutFn` resolves futures of state mutations that are applied the same way.
///
/// `Out::Configure` modifies the Context, for instance to change the projection or reseed the camera.
///
/// `Empty` is the default output used when no eventing/futures need to be handled.
///
pub enum Out<S, E> {
    FutEvent(Vec<FlowFuture<E>>),
    FutFn(Vec<FlowFuture<Mutation<S>>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing a piece of scene logic.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once before the first frame; configure the context and start loads
/// 2. `on_custom_events()` receives resolved futures and externally sent events
/// 3. `on_update()` is called every frame
/// 4. `on_render()` is called every frame and describes the flow's scene tree
/// 5. `on_pointer()` is called when the pointer enters, leaves or clicks a mesh of this flow
/// 6. `on_exit()` is called once when the loop shuts down
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow and configure the context.
    ///
    /// An error aborts the start of the runtime.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> anyhow::Result<Out<S, E>>;

    /// Handle a pointer event on the mesh with pick id `id` rendered by this flow.
    fn on_pointer(&mut self, ctx: &Context, state: &mut S, id: u32, event: PointerEvent) -> Out<S, E>;

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Describe this flow's part of the scene.
    fn on_render(&self, ctx: &Context, state: &S) -> SceneResult<SceneNode>;

    fn on_exit(&mut self, _ctx: &Context, _state: &mut S) {}
}

impl<S, E> Debug for dyn GraphicsFlow<S, E> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

pub(crate) enum FlowEvent<S: 'static, E: 'static> {
    Custom(E),
    Mut(Mutation<S>),
    Exit,
}

impl<S, E> Debug for FlowEvent<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Mut(_) => f.write_str("Mut(|&mut State| -> {...})"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Sends events into a running [`Runtime`]. Cheap to clone and usable from other threads.
pub struct EventSender<S: 'static, E: 'static> {
    tx: UnboundedSender<FlowEvent<S, E>>,
}

impl<S, E> Clone for EventSender<S, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S, E> EventSender<S, E> {
    pub fn send(&self, event: E) -> SceneResult<()> {
        self.tx
            .unbounded_send(FlowEvent::Custom(event))
            .map_err(|_| SceneError::EventLoopClosed)
    }

    pub fn mutate(&self, mutation: Mutation<S>) -> SceneResult<()> {
        self.tx
            .unbounded_send(FlowEvent::Mut(mutation))
            .map_err(|_| SceneError::EventLoopClosed)
    }

    /// Ask the loop to shut down after the current frame.
    pub fn exit(&self) -> SceneResult<()> {
        self.tx
            .unbounded_send(FlowEvent::Exit)
            .map_err(|_| SceneError::EventLoopClosed)
    }
}

/// Runs flow futures without blocking the loop.
struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
}

impl Spawner {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
        })
    }

    fn spawn(&self, task: FlowFuture<()>) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.async_runtime.spawn(task);
        }
        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(task);
        }
    }
}

fn handle_flow_output<S: 'static, E: Send + 'static>(
    spawner: &Spawner,
    ctx: &mut Context,
    tx: &UnboundedSender<FlowEvent<S, E>>,
    out: Out<S, E>,
) {
    match out {
        Out::FutEvent(futures) => {
            for fut in futures {
                let tx = tx.clone();
                spawner.spawn(Box::pin(async move {
                    let event = fut.await;
                    if tx.unbounded_send(FlowEvent::Custom(event)).is_err() {
                        log::debug!("Event resolved after the loop shut down");
                    }
                }));
            }
        }
        Out::FutFn(futures) => {
            for fut in futures {
                let tx = tx.clone();
                spawner.spawn(Box::pin(async move {
                    let mutation = fut.await;
                    if tx.unbounded_send(FlowEvent::Mut(mutation)).is_err() {
                        log::debug!("Mutation resolved after the loop shut down");
                    }
                }));
            }
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// The host loop state: context, flow state, flows and the last composed frame.
pub struct Runtime<S: 'static, E: 'static> {
    ctx: Context,
    state: S,
    flows: Vec<Box<dyn GraphicsFlow<S, E>>>,
    spawner: Spawner,
    tx: UnboundedSender<FlowEvent<S, E>>,
    rx: UnboundedReceiver<FlowEvent<S, E>>,
    hovered: Option<(usize, u32)>,
    /// Mesh under the pointer when the left button went down.
    pressed_on: Option<(usize, u32)>,
    last_frame: Option<Frame>,
    initialized: bool,
    exit_requested: bool,
}

impl<S: 'static, E: Send + 'static> Runtime<S, E> {
    pub fn new(ctx: Context, state: S, flows: Vec<Box<dyn GraphicsFlow<S, E>>>) -> anyhow::Result<Self> {
        let (tx, rx) = unbounded();
        Ok(Self {
            ctx,
            state,
            flows,
            spawner: Spawner::new()?,
            tx,
            rx,
            hovered: None,
            pressed_on: None,
            last_frame: None,
            initialized: false,
            exit_requested: false,
        })
    }

    /// Append a flow. Flows added after [`Runtime::init`] are never initialized.
    pub fn add_flow(&mut self, flow: Box<dyn GraphicsFlow<S, E>>) {
        self.flows.push(flow);
    }

    /// Run `on_init` of every flow. Calling it again has no effect.
    pub fn init(&mut self) -> anyhow::Result<()> {
        if self.initialized {
            return Ok(());
        }
        for flow in self.flows.iter_mut() {
            let out = flow.on_init(&mut self.ctx, &mut self.state)?;
            handle_flow_output(&self.spawner, &mut self.ctx, &self.tx, out);
        }
        self.initialized = true;
        log::info!("Initialized {} flows", self.flows.len());
        Ok(())
    }

    pub fn event_sender(&self) -> EventSender<S, E> {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Pick id and flow of the mesh under the pointer.
    pub fn hovered(&self) -> Option<(usize, u32)> {
        self.hovered
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                FlowEvent::Custom(event) => {
                    let result = self.flows.iter_mut().fold(Some(event), |event, flow| {
                        flow.on_custom_events(&self.ctx, &mut self.state, event?)
                    });
                    if result.is_some() {
                        log::warn!("Warning! Custom event was not consumed this cycle");
                    }
                }
                FlowEvent::Mut(mutation) => mutation(&mut self.state),
                FlowEvent::Exit => self.exit_requested = true,
            }
        }
    }

    /// Advance one frame and compose it.
    ///
    /// A composition error fails the frame; the previous frame stays available.
    pub fn frame(&mut self, dt: Duration) -> SceneResult<&Frame> {
        self.drain_events();

        let CameraResources { camera, controls } = &mut self.ctx.camera;
        controls.update(camera, dt);

        for flow in self.flows.iter_mut() {
            let out = flow.on_update(&self.ctx, &mut self.state, dt);
            handle_flow_output(&self.spawner, &mut self.ctx, &self.tx, out);
        }

        let trees = self
            .flows
            .iter()
            .enumerate()
            .map(|(idx, flow)| flow.on_render(&self.ctx, &self.state).map(|tree| (idx, tree)))
            .collect::<SceneResult<Vec<_>>>()?;
        let frame = Frame::compose(&trees)?;
        Ok(self.last_frame.insert(frame))
    }

    fn dispatch_pointer(&mut self, flow_idx: usize, id: u32, event: PointerEvent) {
        if let Some(flow) = self.flows.get_mut(flow_idx) {
            let out = flow.on_pointer(&self.ctx, &mut self.state, id, event);
            handle_flow_output(&self.spawner, &mut self.ctx, &self.tx, out);
        }
    }

    fn pick_under_mouse(&self) -> Option<(usize, u32)> {
        let frame = self.last_frame.as_ref()?;
        let ray = self.ctx.mouse_ray()?;
        pick(frame, &ray).map(|hit| (hit.flow, hit.id))
    }

    fn set_hovered(&mut self, hovered: Option<(usize, u32)>) {
        if hovered == self.hovered {
            return;
        }
        if let Some((flow, id)) = self.hovered.take() {
            self.dispatch_pointer(flow, id, PointerEvent::Leave);
        }
        if let Some((flow, id)) = hovered {
            self.dispatch_pointer(flow, id, PointerEvent::Enter);
        }
        self.hovered = hovered;
    }

    pub fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.ctx.mouse.coords = position;
        self.ctx.mouse.inside = true;
        let height = self.ctx.size.height;
        let fovy = self.ctx.projection.fovy();
        let CameraResources { camera, controls } = &mut self.ctx.camera;
        controls.pointer_moved(position, height, fovy, camera);
        let hovered = self.pick_under_mouse();
        self.set_hovered(hovered);
    }

    pub fn pointer_left(&mut self) {
        self.ctx.mouse.inside = false;
        self.pressed_on = None;
        self.ctx.camera.controls.drag_end();
        self.set_hovered(None);
    }

    /// A left press starts an orbit drag. Releasing it over the mesh it was
    /// pressed on clicks that mesh.
    pub fn mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let coords = self.ctx.mouse.coords;
        match (button, state) {
            (MouseButton::Left, ElementState::Pressed) => {
                self.ctx.camera.controls.rotate_start(coords);
                self.pressed_on = self.pick_under_mouse();
            }
            (MouseButton::Right, ElementState::Pressed) => {
                self.ctx.camera.controls.pan_start(coords);
            }
            (MouseButton::Left, ElementState::Released) => {
                self.ctx.camera.controls.drag_end();
                let pressed_on = self.pressed_on.take();
                if let Some((flow, id)) = pressed_on.filter(|&hit| self.pick_under_mouse() == Some(hit)) {
                    log::debug!("Clicked mesh {} of flow {}", id, flow);
                    self.dispatch_pointer(flow, id, PointerEvent::Click);
                }
            }
            (_, ElementState::Released) => {
                self.ctx.camera.controls.drag_end();
            }
            _ => (),
        }
    }

    pub fn mouse_wheel(&mut self, delta: MouseScrollDelta) {
        self.ctx.camera.controls.zoom(wheel_steps(&delta));
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Route a window event to the pointer and resize handlers.
    pub fn window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(*position),
            WindowEvent::CursorLeft { .. } => self.pointer_left(),
            WindowEvent::MouseInput { state, button, .. } => self.mouse_input(*button, *state),
            WindowEvent::MouseWheel { delta, .. } => self.mouse_wheel(*delta),
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            _ => (),
        }
    }

    /// Run `on_exit` of every flow once.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        for flow in self.flows.iter_mut() {
            flow.on_exit(&self.ctx, &mut self.state);
        }
        self.initialized = false;
        log::info!("Runtime shut down");
    }
}

pub struct App<S: 'static, E: 'static> {
    window_config: WindowConfig,
    window: Option<Arc<Window>>,
    runtime: Runtime<S, E>,
    presenter: Box<dyn Presenter>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<S: 'static, E: Send + 'static> App<S, E> {
    fn new(window_config: WindowConfig, runtime: Runtime<S, E>, presenter: Box<dyn Presenter>) -> Self {
        Self {
            window_config,
            window: None,
            runtime,
            presenter,
            last_time: Instant::now(),
            error: None,
        }
    }

    fn stop(&mut self, event_loop: &ActiveEventLoop) {
        self.runtime.shutdown();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        match self.runtime.frame(dt) {
            Ok(frame) => {
                if let Err(e) = self.presenter.present(frame) {
                    log::error!("Unable to present frame: {:#}", e);
                }
            }
            Err(e) => {
                log::error!("Unable to compose frame: {}", e);
                self.error = Some(e.into());
                self.stop(event_loop);
                return;
            }
        }
        if self.runtime.exit_requested() {
            self.stop(event_loop);
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl<S: 'static, E: Send + 'static> ApplicationHandler<()> for App<S, E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;
            const CANVAS_ID: &str = "canvas";
            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }
        match event_loop.create_window(window_attributes) {
            Ok(window) => {
                let window = Arc::new(window);
                let size = window.inner_size();
                self.runtime.resize(size.width, size.height);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Unable to create window: {}", e);
                self.error = Some(e.into());
                self.stop(event_loop);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.stop(event_loop),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            event => self.runtime.window_event(&event),
        }
    }
}

/// Build the runtime, initialize its flows and drive it from a window until it exits.
///
/// Logging is set up before `build` runs.
pub fn run<S: 'static, E: Send + 'static>(
    window_config: WindowConfig,
    build: impl FnOnce() -> anyhow::Result<Runtime<S, E>>,
    presenter: impl Presenter + 'static,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let mut runtime = build()?;
    runtime.init()?;

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<()> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(any(
        not(feature = "integration-tests"),
        not(any(target_os = "linux", target_os = "windows"))
    ))]
    let event_loop: EventLoop<()> = EventLoop::new()?;

    let mut app = App::new(window_config, runtime, Box::new(presenter));
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
