use super::*;

#[test]
fn defaults_match_local_development() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "127.0.0.1:8060".parse().unwrap());
    assert_eq!(settings.site.name, "Mondrian");
    assert_eq!(settings.site.environment, Environment::Development);
    assert!(settings.renderer.enabled);
    assert_eq!(settings.renderer.endpoint.as_str(), "http://127.0.0.1:8111/");
    assert_eq!(settings.renderer.timeout, Duration::from_secs(1));
    assert!(settings.cache.enabled);
    assert!(settings.cache.max_entries.is_none());
    assert_eq!(settings.assets.cdn_base_url, "");
    assert!(settings.newsletter.mailing_list.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.renderer.timeout_ms = Some(250);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        renderer_timeout_ms: Some(500),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.renderer.timeout, Duration::from_millis(500));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn legacy_environment_fills_gap_only() {
    let mut raw = RawSettings::default();
    raw.apply_legacy_environment(Some("production".to_string()));
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.environment, Environment::Production);

    let mut raw = RawSettings::default();
    raw.site.environment = Some("development".to_string());
    raw.apply_legacy_environment(Some("production".to_string()));
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.environment, Environment::Development);
}

#[test]
fn cli_environment_beats_legacy_variable() {
    let mut raw = RawSettings::default();
    raw.apply_legacy_environment(Some("production".to_string()));
    raw.apply_serve_overrides(&ServeOverrides {
        environment: Some("dev".to_string()),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.environment, Environment::Development);
}

#[test]
fn production_defaults_to_cdn() {
    let mut raw = RawSettings::default();
    raw.site.environment = Some("production".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.assets.cdn_base_url, DEFAULT_CDN_BASE_URL);
}

#[test]
fn unknown_environment_is_rejected() {
    let mut raw = RawSettings::default();
    raw.site.environment = Some("staging".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid environment");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "site.environment",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.renderer.timeout_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("invalid timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "renderer.timeout_ms",
            ..
        }
    ));
}

#[test]
fn renderer_endpoint_must_be_http() {
    let mut raw = RawSettings::default();
    raw.renderer.endpoint = Some("unix:///tmp/renderer.sock".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid endpoint");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "renderer.endpoint",
            ..
        }
    ));
}

#[test]
fn cache_capacity_must_be_positive() {
    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(128);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.max_entries.map(NonZeroUsize::get), Some(128));
}

#[test]
fn mailing_list_requires_id_and_key() {
    let mut raw = RawSettings::default();
    raw.newsletter.list_id = Some("abc123".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.newsletter.list_id = Some("abc123".to_string());
    raw.newsletter.api_key = Some("secret-us17".to_string());
    raw.newsletter.api_base = Some("http://localhost:9000/3.0".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    let list = settings.newsletter.mailing_list.expect("configured");
    assert_eq!(list.list_id, "abc123");
    assert_eq!(settings.newsletter.api_base.as_str(), "http://localhost:9000/3.0/");
    assert!(!format!("{list:?}").contains("secret"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["mondrian"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "mondrian",
        "serve",
        "--server-port",
        "9000",
        "--renderer-endpoint",
        "http://renderer.internal:8111/",
        "--cache-enabled",
        "false",
        "--cache-max-entries",
        "64",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            let overrides = &serve.overrides;
            assert_eq!(overrides.server_port, Some(9000));
            assert_eq!(
                overrides.renderer_endpoint.as_ref().map(Url::as_str),
                Some("http://renderer.internal:8111/")
            );
            assert_eq!(overrides.cache_enabled, Some(false));
            assert_eq!(overrides.cache_max_entries, Some(64));
        }
    }
}
