#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_present_frames_until_exit() {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use cubes_demo::{
        config::WindowConfig,
        context::Context,
        controls::ControlsConfig,
        data_structures::scene_graph::{NodeKind, SceneNode},
        error::SceneResult,
        flow::{EventSender, GraphicsFlow, Out, Runtime, run},
        interaction::PointerEvent,
        render::{Frame, Presenter},
    };
    use instant::Duration;

    const FRAMES: u64 = 3;

    /// Asks the loop to exit once it has updated `FRAMES` times.
    struct ExitAfter {
        sender: EventSender<u64, ()>,
    }

    impl GraphicsFlow<u64, ()> for ExitAfter {
        fn on_init(&mut self, _: &mut Context, _: &mut u64) -> anyhow::Result<Out<u64, ()>> {
            Ok(Out::Empty)
        }

        fn on_pointer(&mut self, _: &Context, _: &mut u64, _: u32, _: PointerEvent) -> Out<u64, ()> {
            Out::Empty
        }

        fn on_update(&mut self, _: &Context, frames: &mut u64, _: Duration) -> Out<u64, ()> {
            *frames += 1;
            if *frames == FRAMES {
                self.sender.exit().expect("Loop closed before exit");
            }
            Out::Empty
        }

        fn on_custom_events(&mut self, _: &Context, _: &mut u64, event: ()) -> Option<()> {
            Some(event)
        }

        fn on_render(&self, _: &Context, _: &u64) -> SceneResult<SceneNode> {
            Ok(SceneNode::group().with_child(SceneNode::new(NodeKind::PerspectiveCamera {
                fov: 75.0,
                near: 0.1,
                far: 1000.0,
                is_default: true,
            })))
        }
    }

    struct Counting(Arc<AtomicU64>);

    impl Presenter for Counting {
        fn present(&mut self, _: &Frame) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let presented = Arc::new(AtomicU64::new(0));
    let window = WindowConfig {
        title: "window_test".to_string(),
        width: 320,
        height: 240,
    };
    run(
        window,
        || {
            let ctx = Context::new(320, 240, ControlsConfig::default());
            let mut runtime: Runtime<u64, ()> = Runtime::new(ctx, 0, Vec::new())?;
            let sender = runtime.event_sender();
            runtime.add_flow(Box::new(ExitAfter { sender }));
            Ok(runtime)
        },
        Counting(presented.clone()),
    )
    .expect("Event loop failed");

    assert!(presented.load(Ordering::SeqCst) >= FRAMES);
}
