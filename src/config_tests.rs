use super::*;

#[test]
fn test_defaults_without_path() {
    let config = AppConfig::load(None).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.window.width, 800);
    assert_eq!(config.window.height, 600);
    assert!(config.window.resizable);
    assert_eq!(config.renderer.frames_in_flight, 2);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = AppConfig::from_toml(
        r#"
        [window]
        title = "Triangle"
        width = 1280
        "#,
    )
    .unwrap();

    assert_eq!(config.window.title, "Triangle");
    assert_eq!(config.window.width, 1280);
    assert_eq!(config.window.height, 600);
    assert_eq!(config.renderer, RendererConfig::default());
}

#[test]
fn test_renderer_section() {
    let config = AppConfig::from_toml(
        r#"
        [renderer]
        validation = false
        frames_in_flight = 3
        shader_include_dirs = ["shaders", "/opt/include"]
        "#,
    )
    .unwrap();

    assert!(!config.renderer.validation);
    assert_eq!(config.renderer.frames_in_flight, 3);
    assert_eq!(
        config.renderer.shader_include_dirs,
        vec![PathBuf::from("shaders"), PathBuf::from("/opt/include")]
    );
}

#[test]
fn test_zero_frames_in_flight_rejected() {
    let result = AppConfig::from_toml("[renderer]\nframes_in_flight = 0\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_malformed_toml_rejected() {
    let result = AppConfig::from_toml("[window\nwidth = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/triangle.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
