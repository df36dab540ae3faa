use std::{io::Cursor, sync::Arc, time::Duration};

use image::{ImageFormat, Rgba, RgbaImage};
use pixelate::{ImageLoader, MemoryLoader};
use shared::{
    domain::{ContextId, OverlayId, SurfaceId},
    protocol::{commands, CloseOverlayArgs, ImageDataArgs, Message, OpenOverlayArgs, RenderArgs},
};
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::{
    bus::{Bus, Endpoint, Envelope},
    document::Document,
    inject::{overlay_page, Injector, ScriptRegistry},
    overlay::{OverlayHandle, OverlayHost},
    transport::Transport,
};

const IMG: &str = "http://x/img.png";

fn red_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png");
    bytes
}

struct Harness {
    injector: Injector,
    coordinator: Endpoint,
    inbox: UnboundedReceiver<Envelope>,
    tab: SurfaceId,
    document: Document,
}

fn harness(loader: MemoryLoader) -> Harness {
    let loader: Arc<dyn ImageLoader> = Arc::new(loader);
    let mut scripts = ScriptRegistry::new();
    scripts
        .register(CONTENT_SCRIPT, Arc::new(ContentScript))
        .register(LOGIC_SCRIPT, Arc::new(LogicScript::new("relay")))
        .register(
            overlay_page(&ContextId::scrape()),
            Arc::new(ScrapeScript::new(loader)),
        );
    let bus = Bus::new();
    let (coordinator, inbox) = bus.attach_coordinator(ContextId::background());
    let tab = SurfaceId::new("tab-1");
    let document = Document::with_images([IMG]);
    bus.open_surface(tab.clone(), document.clone());
    Harness {
        injector: Injector::new(bus, scripts),
        coordinator,
        inbox,
        tab,
        document,
    }
}

async fn next(inbox: &mut UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .expect("message in time")
        .expect("inbox open")
}

async fn assert_quiet(inbox: &mut UnboundedReceiver<Envelope>) {
    let extra = tokio::time::timeout(Duration::from_millis(150), inbox.recv()).await;
    assert!(extra.is_err(), "unexpected message");
}

fn render(id: &str) -> Message {
    Message::addressed(ContextId::scrape(), commands::RENDER)
        .with_args(&RenderArgs {
            old_image_src: IMG.into(),
            id: OverlayId::new(id),
        })
        .expect("render args")
}

fn mount_scrape(h: &Harness, id: &str) {
    h.injector
        .mount(&OverlayHandle {
            id: OverlayId::new(id),
            hidden: true,
            target_surface: h.tab.clone(),
            overlay: ContextId::scrape(),
            source_locator: IMG.into(),
        })
        .expect("mount scrape");
}

#[tokio::test]
async fn content_script_asks_for_logic() {
    let mut h = harness(MemoryLoader::new());
    h.injector.inject(&h.tab, CONTENT_SCRIPT).expect("inject");

    let envelope = next(&mut h.inbox).await;
    assert_eq!(envelope.message, Message::new(commands::RUN_LOGIC));
    assert_eq!(envelope.sender.surface, Some(h.tab.clone()));
}

#[tokio::test]
async fn scrape_reports_image_data_then_asks_logic_to_close() {
    let mut h = harness(MemoryLoader::new().with_image(IMG, red_png()));
    mount_scrape(&h, "relay_1");

    h.coordinator.send(render("relay_1"), Some(h.tab.clone()));

    let image_data = next(&mut h.inbox).await;
    assert_eq!(image_data.message.cmd, commands::HANDLE_IMAGE_DATA);
    assert!(image_data.responder.expects_reply());
    let args: ImageDataArgs = image_data.message.args_as().expect("image data");
    assert_eq!(args.old_image_src, IMG);
    assert!(args.new_image_src.starts_with(pixelate::PNG_DATA_URI_PREFIX));
    drop(image_data);

    let close = next(&mut h.inbox).await;
    assert_eq!(close.message.to, Some(ContextId::logic()));
    assert_eq!(close.message.cmd, commands::CLOSE_OVERLAY);
    let args: CloseOverlayArgs = close.message.args_as().expect("close args");
    assert_eq!(args.id.as_str(), "relay_1");
}

#[tokio::test]
async fn scrape_renders_once_and_only_for_its_own_overlay() {
    let mut h = harness(MemoryLoader::new().with_image(IMG, red_png()));
    mount_scrape(&h, "relay_1");

    h.coordinator.send(render("relay_other"), Some(h.tab.clone()));
    h.coordinator.send(render("relay_1"), Some(h.tab.clone()));
    h.coordinator.send(render("relay_1"), Some(h.tab.clone()));

    assert_eq!(next(&mut h.inbox).await.message.cmd, commands::HANDLE_IMAGE_DATA);
    assert_eq!(next(&mut h.inbox).await.message.cmd, commands::CLOSE_OVERLAY);
    assert_quiet(&mut h.inbox).await;
}

#[tokio::test]
async fn scrape_closes_without_image_data_when_the_source_fails() {
    let mut h = harness(MemoryLoader::new());
    mount_scrape(&h, "relay_1");

    h.coordinator.send(render("relay_1"), Some(h.tab.clone()));

    let close = next(&mut h.inbox).await;
    assert_eq!(close.message.cmd, commands::CLOSE_OVERLAY);
    assert_quiet(&mut h.inbox).await;
}

#[tokio::test]
async fn logic_opens_overlays_swaps_images_and_closes_overlays() {
    let mut h = harness(MemoryLoader::new());
    h.injector.inject(&h.tab, LOGIC_SCRIPT).expect("inject logic");
    assert_eq!(next(&mut h.inbox).await.message, Message::new(commands::ADD_MENU));

    let open = Message::addressed(ContextId::logic(), commands::OPEN_OVERLAY)
        .with_args(&OpenOverlayArgs {
            overlay: ContextId::scrape(),
            hidden: true,
            id: OverlayId::new("relay_5"),
            old_image_src: IMG.into(),
        })
        .expect("open args");
    h.coordinator.send(open, Some(h.tab.clone()));

    let render = next(&mut h.inbox).await;
    assert_eq!(render.message.to, Some(ContextId::scrape()));
    let args: RenderArgs = render.message.args_as().expect("render args");
    assert_eq!(args.id.as_str(), "relay_5");
    assert_eq!(h.injector.bus().overlays(&h.tab), vec![OverlayId::new("relay_5")]);

    let mut revisions = h.document.subscribe();
    revisions.borrow_and_update();
    let rendered = Message::addressed(ContextId::logic(), commands::RENDER_ALTERED_IMAGE)
        .with_args(&ImageDataArgs {
            old_image_src: IMG.into(),
            new_image_src: "data:image/png;base64,AAAA".into(),
        })
        .expect("image args");
    h.coordinator.send(rendered, Some(h.tab.clone()));
    tokio::time::timeout(Duration::from_secs(5), revisions.changed())
        .await
        .expect("document updated in time")
        .expect("document alive");
    assert_eq!(h.document.sources(), vec!["data:image/png;base64,AAAA"]);

    let close = Message::addressed(ContextId::logic(), commands::CLOSE_OVERLAY)
        .with_args(&CloseOverlayArgs {
            id: OverlayId::new("relay_5"),
        })
        .expect("close args");
    h.coordinator.send(close, Some(h.tab.clone()));
    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.injector.bus().overlays(&h.tab).is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("overlay closed");
}
