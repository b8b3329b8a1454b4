use std::sync::Arc;
use std::time::{Duration, Instant};

use wgpu_content::{
    AssetKind, CacheSettings, ContentManager, FontRegistry, GpuContext,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn manager_with(settings: CacheSettings) -> Arc<ContentManager> {
    init_logging();
    let fonts = FontRegistry::new("TestSans", vec!["TestSerif".to_owned()]);
    ContentManager::new(settings, fonts)
}

fn manager() -> Arc<ContentManager> {
    manager_with(CacheSettings::default())
}

/// Settings that put the cache under pressure after a couple of small
/// textures and let `clean()` act immediately.
fn pressure_settings() -> CacheSettings {
    CacheSettings {
        low_cleanup_threshold: 512,
        high_cleanup_threshold: 64 * 1024,
        short_cleanup_interval_secs: 0.001,
        long_cleanup_interval_secs: 0.001,
        idle_timeout_secs: 0.0,
        ..CacheSettings::default()
    }
}

#[test]
fn identical_requests_share_one_handle() {
    let manager = manager();

    let a = manager.get_texture("background.png");
    let b = manager.get_texture("background.png");
    assert!(Arc::ptr_eq(&a, &b));

    let e1 = manager.get_effect("blur");
    let e2 = manager.get_effect("blur");
    assert!(Arc::ptr_eq(&e1, &e2));

    assert_eq!(manager.entry_count(AssetKind::Texture), 1);
    assert_eq!(manager.entry_count(AssetKind::Effect), 1);
}

#[test]
fn sized_requests_are_distinct_assets() {
    let manager = manager();

    let full = manager.get_texture("background.png");
    let small = manager.get_texture_sized("background.png", 128, 128);
    let other = manager.get_texture_sized("background.png", 256, 256);

    assert!(!full.shares_core(&small));
    assert!(!small.shares_core(&other));
    assert_eq!(manager.entry_count(AssetKind::Texture), 3);
}

#[test]
fn thumbnails_live_in_their_own_namespace() {
    let manager = manager();

    let texture = manager.get_texture("photo.jpg");
    let thumb = manager.get_thumbnail("photo.jpg");
    assert!(!texture.shares_core(&thumb));
    assert_eq!(manager.entry_count(AssetKind::Texture), 1);
    assert_eq!(manager.entry_count(AssetKind::Thumbnail), 1);
}

#[test]
fn in_memory_images_are_cached_by_key() {
    let manager = manager();

    let bytes = vec![1, 2, 3, 4];
    let a = manager.get_texture_from_bytes("download:logo", bytes.clone());
    let b = manager.get_texture_from_bytes("download:logo", bytes);
    assert!(Arc::ptr_eq(&a, &b));

    let c = manager.get_texture_from_reader("stream:logo", &[9u8, 9, 9][..]);
    assert!(!a.shares_core(&c));
}

#[test]
fn font_requests_resolve_family_and_round_size() {
    let manager = manager();

    let unknown = manager.get_font("NoSuchFamily", 14.0);
    assert_eq!(unknown.family(), "TestSans");

    let a = manager.get_font("TestSerif", 12.2);
    let b = manager.get_font("TestSerif", 13.0);
    assert_eq!(a.size(), 13);
    assert!(a.shares_core(&b));
}

#[test]
fn sweep_forgets_abandoned_entries_only() {
    let manager = manager();

    let held = manager.get_render_texture("held");
    let dropped = manager.get_render_texture("dropped");
    drop(dropped);

    assert_eq!(manager.sweep_dead_entries(), 1);
    assert_eq!(manager.entry_count(AssetKind::RenderTexture), 1);

    let again = manager.get_render_texture("held");
    assert!(Arc::ptr_eq(&held, &again));
}

#[test]
fn clear_empties_every_table() {
    let manager = manager();

    let _t = manager.get_texture("a.png");
    let _n = manager.get_thumbnail("a.png");
    let _e = manager.get_effect("blur");
    let _f = manager.get_font("TestSans", 16.0);
    let _r = manager.get_render_target("scene");

    manager.clear();
    for kind in AssetKind::ALL {
        assert_eq!(manager.entry_count(kind), 0);
    }
    assert_eq!(manager.total_allocation(), 0);
}

#[test]
fn clean_below_budget_is_a_no_op() {
    let manager = manager();
    let handle = manager.get_texture("a.png");

    manager.begin_frame();
    manager.clean();

    assert!(!handle.is_allocated());
    assert_eq!(manager.entry_count(AssetKind::Texture), 1);
}

// The tests below need a live adapter; run them with
// `cargo test -- --ignored` on a machine with a GPU.

fn gpu() -> GpuContext {
    GpuContext::new_blocking().expect("no usable GPU adapter")
}

#[test]
#[ignore]
fn color_texture_allocation_is_accounted_and_freed() {
    let manager = manager();
    let gpu = gpu();

    let texture = manager.get_color_texture([255, 0, 0, 255]);
    assert!(!texture.is_allocated());

    texture.allocate(&gpu);
    assert!(texture.is_allocated());
    assert_eq!(texture.width(), 16);
    assert_eq!(texture.height(), 16);
    assert_eq!(manager.total_allocation(), 16 * 16 * 4);

    manager.free();
    assert!(!texture.is_allocated());
    assert_eq!(manager.total_allocation(), 0);
    // The entry survives a free and the handle stays usable.
    texture.allocate(&gpu);
    assert!(texture.is_allocated());
}

#[test]
#[ignore]
fn abandoned_allocated_texture_is_warm_on_rerequest() {
    let manager = manager();
    let gpu = gpu();

    let first = manager.get_color_texture([0, 255, 0, 255]);
    first.allocate(&gpu);
    drop(first);

    let second = manager.get_color_texture([0, 255, 0, 255]);
    assert!(second.is_allocated());
    assert_eq!(manager.total_allocation(), 16 * 16 * 4);
}

#[test]
#[ignore]
fn missing_file_failure_is_sticky_until_cleared() {
    let manager = manager();
    let gpu = gpu();

    let texture = manager.get_texture("definitely_not_here.png");
    texture.allocate(&gpu);
    assert!(texture.load_failed());
    assert!(!texture.is_allocated());

    // No silent retry while the failure stands.
    texture.allocate(&gpu);
    assert!(texture.load_failed());

    texture.clear_failed_state();
    assert!(!texture.load_failed());
}

#[test]
#[ignore]
fn clean_frees_idle_assets_over_budget() {
    let manager = manager_with(pressure_settings());
    let gpu = gpu();

    let red = manager.get_color_texture([255, 0, 0, 255]);
    let blue = manager.get_color_texture([0, 0, 255, 255]);
    red.allocate(&gpu);
    blue.allocate(&gpu);
    assert_eq!(manager.total_allocation(), 2 * 16 * 16 * 4);

    // Advance a frame well past the cleanup interval; the zero idle timeout
    // makes both textures eligible.
    let next_frame = Instant::now() + Duration::from_secs(1);
    manager.clock().begin_frame_at(next_frame);
    manager.clean();

    assert_eq!(manager.total_allocation(), 0);
    assert!(!red.is_allocated());
    assert!(!blue.is_allocated());
    // Entries stay for re-activation.
    assert_eq!(manager.entry_count(AssetKind::Texture), 2);
}

#[test]
#[ignore]
fn consumed_limit_schedules_an_early_follow_up() {
    // One deallocation per pass; the follow-up frame lands past the short
    // interval but far inside the long one, so it only cleans if the first
    // pass shortened the cadence.
    let manager = manager_with(CacheSettings {
        low_cleanup_threshold: 512,
        high_cleanup_threshold: 64 * 1024,
        low_deallocation_limit: 1,
        short_cleanup_interval_secs: 0.01,
        long_cleanup_interval_secs: 10.0,
        idle_timeout_secs: 0.0,
        ..CacheSettings::default()
    });
    let gpu = gpu();

    let red = manager.get_color_texture([255, 0, 0, 255]);
    let blue = manager.get_color_texture([0, 0, 255, 255]);
    red.allocate(&gpu);
    blue.allocate(&gpu);
    assert_eq!(manager.total_allocation(), 2 * 16 * 16 * 4);

    let first_pass = Instant::now() + Duration::from_secs(11);
    manager.clock().begin_frame_at(first_pass);
    manager.clean();
    // The limit caps the pass at one texture.
    assert_eq!(manager.total_allocation(), 16 * 16 * 4);

    manager
        .clock()
        .begin_frame_at(first_pass + Duration::from_millis(20));
    manager.clean();
    assert_eq!(manager.total_allocation(), 0);
}

#[test]
#[ignore]
fn render_target_reallocates_on_resize() {
    let manager = manager();
    let gpu = gpu();

    let target = manager.get_render_target("offscreen");
    target.allocate(&gpu, 64, 64);
    assert_eq!((target.width(), target.height()), (64, 64));
    assert_eq!(manager.total_allocation(), 64 * 64 * 4);

    target.allocate(&gpu, 128, 128);
    assert_eq!((target.width(), target.height()), (128, 128));
    assert_eq!(manager.total_allocation(), 128 * 128 * 4);

    // Same size is a no-op.
    target.allocate(&gpu, 128, 128);
    assert_eq!(manager.total_allocation(), 128 * 128 * 4);
}

#[test]
#[ignore]
fn glyphs_pack_into_the_atlas() {
    let manager = manager();
    let gpu = gpu();

    let font = manager.get_font("TestSans", 24.0);
    font.allocate(&gpu);
    assert!(font.is_allocated());

    let bitmap = vec![0xffu8; 8 * 12];
    let rect = font
        .add_glyph(&gpu, &bitmap, 8, 12)
        .expect("fresh atlas must have room");
    assert_eq!((rect.width, rect.height), (8, 12));
    assert!(rect.u1 > rect.u0 && rect.v1 > rect.v0);

    let second = font
        .add_glyph(&gpu, &bitmap, 8, 12)
        .expect("fresh atlas must have room");
    assert_ne!((rect.x, rect.y), (second.x, second.y));
}
