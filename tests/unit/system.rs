use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::*;
use crate::render::headless::HeadlessDevice;

static JUNK: &[u8] = b"not an image at all";

fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the pipeline");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn defaults_match_reserved_capacities() {
    let opts = AssetSystemOpts::default();
    assert_eq!(opts.image_capacity, 10);
    assert_eq!(opts.font_capacity, 3);
    assert_eq!(opts.queue_capacity, 20);
    assert_eq!(opts.worker_count, 1);
    assert_eq!(opts.render_mode, RenderMode::Cpu);
    opts.validate().unwrap();
}

#[test]
fn validate_rejects_bad_opts() {
    let zero_workers = AssetSystemOpts {
        worker_count: 0,
        ..AssetSystemOpts::default()
    };
    assert!(matches!(zero_workers.validate(), Err(AssetError::Config(_))));

    let short_queue = AssetSystemOpts {
        queue_capacity: 5,
        ..AssetSystemOpts::default()
    };
    let err = short_queue.validate().unwrap_err();
    assert!(err.to_string().contains("queue_capacity"));

    assert!(AssetSystem::new(zero_workers).is_err());
}

#[test]
fn zero_poll_interval_is_rejected() {
    let busy_poll = AssetSystemOpts {
        poll_interval_ms: 0,
        ..AssetSystemOpts::default()
    };
    let err = busy_poll.validate().unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
    assert!(AssetSystem::new(busy_poll).is_err());

    let json = AssetSystemOpts::from_json(r#"{ "poll_interval_ms": 0 }"#).unwrap();
    assert!(json.validate().is_err());
}

#[test]
fn json_opts_fill_missing_keys_with_defaults() {
    let opts = AssetSystemOpts::from_json(r#"{ "worker_count": 2, "render_mode": "gpu" }"#).unwrap();
    assert_eq!(opts.worker_count, 2);
    assert_eq!(opts.render_mode, RenderMode::Gpu);
    assert_eq!(opts.image_capacity, 10);

    assert!(AssetSystemOpts::from_json("{ nope").is_err());
}

#[test]
fn relative_paths_resolve_against_asset_root() {
    let opts = AssetSystemOpts {
        asset_root: Some(PathBuf::from("/data/assets")),
        ..AssetSystemOpts::default()
    };
    assert_eq!(opts.resolve(Path::new("a.png")), Path::new("/data/assets/a.png"));
    assert_eq!(opts.resolve(Path::new("/abs/b.png")), Path::new("/abs/b.png"));
}

#[test]
fn asset_system_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AssetSystem>();
}

#[test]
fn released_before_decode_is_never_finalized() {
    let sys = AssetSystem::new(AssetSystemOpts::default()).unwrap();
    let mut dev = HeadlessDevice::new();

    let h = sys.acquire_image(JUNK);
    sys.release_image(h);
    wait_for(|| sys.counters.failed.load(Ordering::Relaxed) == 1);
    wait_for(|| sys.queues.completed_len() == 1);

    assert!(sys.run_post_process(&mut dev));
    let info = sys.image_info(h).unwrap();
    assert_eq!(info.references, 0);
    assert!(!info.failed);
    assert!(!info.loaded);
    assert!(sys.find_image(DedupKey::for_bytes(&SourceBytes::from(JUNK))).is_none());
}

#[test]
fn over_release_is_ignored() {
    let sys = AssetSystem::new(AssetSystemOpts::default()).unwrap();
    let h = sys.acquire_image(JUNK);
    sys.release_image(h);
    sys.release_image(h);
    assert_eq!(sys.image_info(h).unwrap().references, 0);

    // A fresh acquire skips the released slot.
    let again = sys.acquire_image(JUNK);
    assert_ne!(again, h);
    assert_eq!(sys.stats().images, 2);
}

#[test]
fn handles_do_not_cross_systems() {
    let a = AssetSystem::new(AssetSystemOpts::default()).unwrap();
    let b = AssetSystem::new(AssetSystemOpts::default()).unwrap();
    let h = a.acquire_image(JUNK);
    assert!(b.image_info(h).is_none());
    assert!(!b.is_image_loaded(h));
    b.release_image(h);
    assert_eq!(a.image_info(h).unwrap().references, 1);
}

#[test]
fn shutdown_joins_workers_and_clears_state() {
    let mut sys = AssetSystem::new(AssetSystemOpts::default()).unwrap();
    let _ = sys.acquire_image(JUNK);
    let queues = Arc::clone(&sys.queues);
    sys.stop();
    assert!(!queues.is_running());
    assert_eq!(queues.pending_len() + queues.completed_len(), 0);
    assert_eq!(sys.stats().images, 0);
    // Second stop is a no-op.
    sys.stop();
}
