use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use lamour::capture::{CameraDevice, CaptureError, Facing, StillCamera};
use lamour::config::Configuration;
use lamour::events::NoticeLevel;
use lamour::navigation::Move;
use lamour::session::Session;
use lamour::store::{Entry, ListStore, MemoryStore, Table};
use lamour::tasks::board::BoardMode;

fn config() -> Configuration {
    let yaml = r#"
assets-dir: "/nowhere"
polls:
  - id: date
    question: "Perfect first date?"
    options: [Dinner, Movies, Picnic, Stay in]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    cfg.validated().unwrap()
}

#[tokio::test]
async fn session_wires_every_component() {
    let store = Arc::new(MemoryStore::new());
    let camera: Box<dyn CameraDevice> = Box::new(StillCamera::new(RgbaImage::new(64, 48)));
    let mut session = Session::new(&config(), Arc::clone(&store), None, Some(camera)).unwrap();
    session.load_boards().await;

    assert_eq!(session.songs.mode(), &BoardMode::Synced);
    assert_eq!(session.songs.items().len(), 5);
    assert_eq!(session.red_flags.items().len(), 6);

    for name in ["id-card", "valentine-card", "photobooth"] {
        assert!(session.compositor(name).is_some(), "{name}");
    }
    assert!(session.compositor("birthday").is_none());

    assert!(session.vote("date", "guest-1", "Picnic"));
    assert!(!session.vote("date", "guest-1", "Dinner"));
    let notices = session.take_notices();
    let last = notices.last().unwrap();
    assert_eq!(last.level, NoticeLevel::Error);
    assert_eq!(last.message, "You have already voted in this poll!");
    assert_eq!(session.polls.results("date").unwrap()[2].percent, 100);

    assert_eq!(session.navigator.go_to(5, Instant::now()), Move::To(5));

    session.camera.as_mut().unwrap().start().unwrap();
    session.teardown();
    assert!(!session.camera.as_ref().unwrap().is_live());
    assert!(!session.songs.is_live());
    assert!(!session.red_flags.is_live());
}

#[tokio::test]
async fn remote_inserts_reach_the_board() {
    let store = Arc::new(MemoryStore::new());
    let mut session = Session::new(&config(), Arc::clone(&store), None, None).unwrap();
    session.load_boards().await;

    store
        .insert(Table::Songs, Entry::song("Adorn", "Miguel", Some("R&B")))
        .await
        .unwrap();
    assert_eq!(session.songs.sync_next().await, Some(true));
    assert_eq!(session.songs.items()[0].entry, Entry::song("Adorn", "Miguel", Some("R&B")));

    assert!(session.songs.submit(Entry::song("Perfect", "Ed Sheeran", None)).await);
    assert_eq!(session.songs.sync_next().await, Some(false));
    assert_eq!(session.songs.items().len(), 7);
}

#[tokio::test]
async fn offline_store_degrades_visibly() {
    let store = Arc::new(MemoryStore::offline("connection refused"));
    let mut session = Session::new(&config(), store, None, None).unwrap();
    session.load_boards().await;

    assert!(matches!(
        session.red_flags.mode(),
        BoardMode::LocalOnly { reason } if reason.contains("connection refused")
    ));
    assert_eq!(session.red_flags.items().len(), 6);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Info));

    assert!(!session.songs.submit(Entry::song("", "Nobody", None)).await);
    assert_eq!(
        session.take_notices()[0].message,
        "Please fill in song title and artist"
    );
}

#[test]
fn denied_camera_leaves_session_idle() {
    let camera: Box<dyn CameraDevice> =
        Box::new(StillCamera::failing(CaptureError::PermissionDenied));
    let store = Arc::new(MemoryStore::new());
    let mut session = Session::new(&config(), store, None, Some(camera)).unwrap();
    let mut capture = session.camera.take().unwrap();
    let booth = session.compositor("photobooth").unwrap();
    assert!(!booth.start_camera(&mut capture));
    assert!(!capture.is_live());
    let notices = session.take_notices();
    assert_eq!(notices[0].message, "Camera access denied or not available");
}

#[test]
fn camera_request_follows_the_configuration() {
    let yaml = r#"
camera:
  facing: environment
  ideal: { width: 1920, height: 1080 }
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    let camera: Box<dyn CameraDevice> = Box::new(StillCamera::new(RgbaImage::new(8, 8)));
    let session = Session::new(&cfg, Arc::new(MemoryStore::new()), None, Some(camera)).unwrap();
    let request = session.camera.as_ref().unwrap().request();
    assert_eq!(request.facing, Facing::Environment);
    assert_eq!((request.ideal.width, request.ideal.height), (1920, 1080));
}
