use std::io::Cursor;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use image::{ImageFormat, Rgba, RgbaImage};
use lamour::capture::{CaptureSession, StillCamera};
use lamour::compositor::Compositor;
use lamour::events::{drain, Notifier, NoticeLevel};
use lamour::export::{ExportManager, ExportOutcome};
use lamour::surface::Surface;
use lamour::template::{self, Template};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn near(px: &Rgba<u8>, want: Rgba<u8>) -> bool {
    px.0.iter().zip(want.0).all(|(a, b)| a.abs_diff(b) <= 2)
}

/// Red, green and blue vertical thirds.
fn thirds(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| match x * 3 / width {
        0 => RED,
        1 => GREEN,
        _ => BLUE,
    })
}

fn png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn id_card_without_artwork() -> Template {
    let mut card = Template::id_card();
    card.background.asset = None;
    card
}

#[test]
fn id_card_frame_shows_only_the_centre_square() {
    let (notifier, mut notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(id_card_without_artwork()), None, notifier);
    assert!(comp.load_photo_bytes(&png(&thirds(600, 200))));
    let surface = comp.render();

    // Frame is 360x360 at (332, 365); the centre square of the photo is green.
    for (x, y) in [(334, 367), (512, 545), (689, 722), (333, 723)] {
        let px = surface.pixel(x, y);
        assert!(near(&px, GREEN), "({x}, {y}) = {px:?}");
    }
    // Outside the frame the placeholder shows through.
    assert_eq!(surface.pixel(331, 545), Rgba([0xF5, 0xF5, 0xF5, 255]));
    assert_eq!(surface.pixel(692, 545), Rgba([0xF5, 0xF5, 0xF5, 255]));
    assert_eq!(drain(&mut notices)[0].level, NoticeLevel::Success);
}

#[test]
fn rotated_photo_still_covers_the_frame() {
    let (notifier, _notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(Template::photobooth()), None, notifier);
    assert!(comp.load_photo_bytes(&png(&thirds(300, 100))));
    assert!(comp.rotate());
    let surface = comp.render();
    // After a quarter turn the stripes run horizontally; the frame centre
    // lands in the middle (green) stripe and the corners are still photo.
    assert!(near(&surface.pixel(300, 360), GREEN));
    for (x, y) in [(45, 45), (554, 674)] {
        let px = surface.pixel(x, y);
        assert_eq!(px[3], 255);
        assert!(px[0] > 200 || px[1] > 200 || px[2] > 200, "({x}, {y}) = {px:?}");
    }
    // White border drawn over the photo edge.
    assert_eq!(surface.pixel(40, 360), Rgba([255, 255, 255, 255]));
}

#[test]
fn export_without_inputs_is_the_bare_template() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ExportManager::new(dir.path());
    let template = Template::valentine_card();

    let mut expected = Surface::new(template.size);
    template::draw_background(&mut expected, &template, None);
    template::draw_decorations(&mut expected, &template.overlay, None);

    let (notifier, _notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(template), None, notifier);
    let now = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
    let outcome = comp.export(&manager, now).unwrap();
    let ExportOutcome::Saved { path } = outcome else {
        panic!("expected a save");
    };
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("lamour-valentine-card-{}.png", now.timestamp_millis())
    );
    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(&saved, expected.image());
}

#[test]
fn export_name_follows_the_text() {
    let (notifier, _notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(id_card_without_artwork()), None, notifier);
    comp.set_text("Thandi Mokoena");
    assert_eq!(comp.export_filename(Utc::now()), "lamour-experience-thandi-mokoena.png");
}

#[test]
fn reset_returns_to_the_bare_template() {
    let (notifier, _notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(id_card_without_artwork()), None, notifier);
    let bare = comp.render().image().clone();
    comp.load_photo_bytes(&png(&thirds(90, 30)));
    comp.set_text("someone");
    assert_ne!(comp.render().image(), &bare);
    comp.reset();
    assert_eq!(comp.render().image(), &bare);
}

#[test]
fn capture_then_export_from_the_photobooth() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ExportManager::new(dir.path());
    let (notifier, mut notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(Template::photobooth()), None, notifier);

    let camera = StillCamera::new(RgbaImage::from_pixel(1280, 720, BLUE));
    let releases = camera.release_counter();
    let mut session = CaptureSession::new(Box::new(camera));
    assert!(comp.start_camera(&mut session));
    assert!(comp.capture_photo(&mut session));
    assert_eq!(releases.load(std::sync::atomic::Ordering::SeqCst), 1);

    assert!(comp.set_zoom(2.0));
    assert!(comp.nudge(-5000.0, 0.0));
    let outcome = comp.export(&manager, Utc::now()).unwrap();
    assert!(matches!(outcome, ExportOutcome::Saved { .. }));
    let messages: Vec<String> = drain(&mut notices).into_iter().map(|n| n.message).collect();
    assert_eq!(messages.last().map(String::as_str), Some("Downloaded!"));
}

#[tokio::test]
async fn later_load_wins_over_slower_earlier_load() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.png");
    std::fs::write(&first, png(&RgbaImage::from_pixel(8, 8, RED))).unwrap();

    let (notifier, _notices) = Notifier::channel();
    let mut comp = Compositor::new(Arc::new(Template::photobooth()), None, notifier);
    let early = comp.begin_load();
    let late = comp.begin_load();
    assert!(comp.finish_load(late, Ok(RgbaImage::from_pixel(8, 8, GREEN))));
    let decoded = lamour::tasks::loader::load_file(first).await;
    assert!(!comp.finish_load(early, decoded));
    assert_eq!(*comp.photo().unwrap().image().get_pixel(0, 0), GREEN);
}
