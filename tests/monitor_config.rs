use std::sync::Mutex;

use tempfile::NamedTempFile;

use armwatch::config::MonitorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ARMWATCH_CONFIG",
        "ARMWATCH_SOURCE",
        "ARMWATCH_LISTEN",
        "ARMWATCH_BACKEND",
        "ARMWATCH_TARGET_FPS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_load_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load(None).expect("load defaults");
    assert_eq!(cfg.source.url, "stub://bench");
    assert_eq!(cfg.backend, "luma");
    assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
    assert_eq!(cfg.tiling.tile_width, 512);
    assert_eq!(cfg.tiling.overlap_ratio, 0.2);
    assert_eq!(cfg.tracking.rules.movement_threshold_px, 5.0);
    assert_eq!(cfg.tracking.rules.alert_threshold.as_secs(), 5);
    assert_eq!(cfg.encoder.stream_width, 800);
    assert_eq!(cfg.encoder.jpeg_quality, 70);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "url": "stub://cell-3",
            "target_fps": 15,
            "width": 1920,
            "height": 1080
        },
        "detection": {
            "backend": "stub",
            "confidence_threshold": 0.4,
            "tile_width": 640,
            "tile_height": 640,
            "overlap_ratio": 0.25,
            "merge_iou": 0.6,
            "tile_budget_ms": 1500
        },
        "tracking": {
            "association_radius": 80.0,
            "max_misses": 5,
            "movement_threshold_px": 3.0,
            "alert_secs": 8.0
        },
        "stream": {
            "listen": "127.0.0.1:9000",
            "stream_width": 640,
            "jpeg_quality": 85
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("ARMWATCH_CONFIG", file.path());
    std::env::set_var("ARMWATCH_SOURCE", "stub://override");
    std::env::set_var("ARMWATCH_TARGET_FPS", "20");

    let cfg = MonitorConfig::load(None).expect("load config");

    // Env wins over the file.
    assert_eq!(cfg.source.url, "stub://override");
    assert_eq!(cfg.source.target_fps, 20);
    // The rest comes from the file.
    assert_eq!(cfg.source.width, 1920);
    assert_eq!(cfg.backend, "stub");
    assert_eq!(cfg.tiling.tile_width, 640);
    assert_eq!(cfg.tiling.overlap_ratio, 0.25);
    assert_eq!(cfg.tiling.merge_iou, 0.6);
    assert_eq!(cfg.tiling.tile_budget.as_millis(), 1500);
    assert_eq!(cfg.tracking.association_radius, 80.0);
    assert_eq!(cfg.tracking.max_misses, 5);
    assert_eq!(cfg.tracking.rules.movement_threshold_px, 3.0);
    assert_eq!(cfg.tracking.rules.alert_threshold.as_secs_f32(), 8.0);
    assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.encoder.stream_width, 640);
    assert_eq!(cfg.encoder.jpeg_quality, 85);

    clear_env();
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cases = [
        r#"{"stream": {"jpeg_quality": 0}}"#,
        r#"{"stream": {"stream_width": 0}}"#,
        r#"{"detection": {"overlap_ratio": 0.95}}"#,
        r#"{"detection": {"confidence_threshold": 1.5}}"#,
        r#"{"detection": {"tile_width": 0}}"#,
        r#"{"tracking": {"alert_secs": 0.0}}"#,
        r#"{"tracking": {"association_radius": -1.0}}"#,
    ];
    for json in cases {
        let mut file = NamedTempFile::new().expect("temp config");
        std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
        assert!(
            MonitorConfig::load(Some(file.path())).is_err(),
            "config should be rejected: {json}"
        );
    }

    clear_env();
}

#[test]
fn malformed_json_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"not json").expect("write config");
    let err = MonitorConfig::load(Some(file.path())).unwrap_err().to_string();
    assert!(err.contains("invalid config file"));

    clear_env();
}
