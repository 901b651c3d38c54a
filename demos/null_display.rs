use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use virtual_display::events::DisplayEvent;
use virtual_display::frame::TokioScheduler;
use virtual_display::render::backends::null::{NullBufferTexture, NullDisplayService, NullRecorder};
use virtual_display::render::{BufferSize, PhysicalBounds};
use virtual_display::view::null::{NullAccessibilityDelegate, NullViewFactory};
use virtual_display::view::{CreationParams, EmbeddedView, ViewId};
use virtual_display::{ControllerArgs, DisplayConfig, DisplayContext, DisplayError, VirtualDisplayController};

#[tokio::main]
async fn main() -> Result<(), DisplayError> {
    env_logger::init();

    // Configure how virtual targets are requested. The timeout makes sure the resize
    // completes even when the view never draws.
    let config = DisplayConfig::builder()
        .target_name("null-display-demo")
        .resize_timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| DisplayError::InvalidState(e.to_string()))?;

    // The null backend does not render anything, it only records what happens.
    let recorder = NullRecorder::new();
    let service = Arc::new(NullDisplayService::new(recorder.clone()));
    let context = DisplayContext::new(service, Arc::new(TokioScheduler::current()?)).with_config(config);

    let factory = Arc::new(NullViewFactory::new());
    let mut controller = VirtualDisplayController::create(
        context,
        ControllerArgs {
            physical: PhysicalBounds::new(1080, 1920, 420),
            requested: BufferSize::new(800, 600),
            view_id: ViewId(1),
            params: CreationParams::new("webview").with_arg("url", "https://example.org"),
            factory: factory.clone(),
            accessibility: Arc::new(NullAccessibilityDelegate),
            texture: Box::new(NullBufferTexture::new(recorder.clone())),
            focus_listener: Arc::new(|id: ViewId, focused: bool| println!("view {} focused: {}", id, focused)),
        },
    )?;
    println!("created {:?} with texture {}", controller, controller.texture_id());

    // Print everything the controller reports from here on.
    let mut events = controller.subscribe_events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("event: {:?}", event);
            if matches!(event, DisplayEvent::Disposed { .. }) {
                break;
            }
        }
    });

    let (done_tx, done_rx) = oneshot::channel();
    controller.resize(400, 300, move |outcome| {
        let _ = done_tx.send(outcome);
    })?;
    println!("buffer is now {}x{}", controller.buffer_width(), controller.buffer_height());

    // A real platform attaches the view to the new display and draws it. Do that by hand.
    if let Some(view) = controller.view() {
        let tree = view.tree().clone();
        tree.dispatch_attached();
        tree.dispatch_draw();
    }

    match done_rx.await {
        Ok(outcome) => println!("resize completed: {}", outcome),
        Err(_) => println!("resize was cancelled"),
    }

    controller.dispose();
    let _ = printer.await;

    for op in recorder.ops() {
        println!("backend: {:?}", op);
    }
    Ok(())
}
