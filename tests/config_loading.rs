// tests/config_loading.rs
use blog_metrics::cache::ProviderId;
use blog_metrics::config::{load_config_default, load_config_from, AppConfig, ENV_CONFIG_PATH};
use std::{env, fs};

#[test]
fn toml_and_json_files_load() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("blog_metrics.toml");
    fs::write(
        &p_toml,
        r#"
[share_count]
window_days = 7
disable = "facebook"
site_root = "https://blog.example/"

[pageviews]
start_date = "2023-01-01"
limit = 500
"#,
    )
    .unwrap();
    let cfg = load_config_from(&p_toml).unwrap();
    assert_eq!(cfg.share_count.window_days, 7);
    assert!(cfg.share_count.disable.contains(ProviderId::Facebook));
    assert_eq!(cfg.share_count.sitemap_url(), "https://blog.example/post-sitemap.xml");
    assert_eq!(cfg.pageviews.request().start_date, "2023-01-01");
    assert_eq!(cfg.pageviews.request().end_date, "today");
    assert_eq!(cfg.pageviews.limit, 500);

    let p_json = dir.path().join("blog_metrics.json");
    fs::write(&p_json, r#"{"pageviews": {"report_file": "ga.json"}}"#).unwrap();
    let cj = load_config_from(&p_json).unwrap();
    assert_eq!(cj.share_count, AppConfig::default().share_count);
    assert!(cj.pageviews.report_file.is_some());
}

#[serial_test::serial]
#[test]
fn default_uses_flag_then_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);

    // 1) Nothing -> defaults
    let v = load_config_default(None).unwrap();
    assert_eq!(v, AppConfig::default());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("blog_metrics.toml"),
        "[share_count]\nwindow_days = 3\n",
    )
    .unwrap();
    assert_eq!(load_config_default(None).unwrap().share_count.window_days, 3);

    // 3) Env wins over fallback
    let p_env = tmp.path().join("env.json");
    fs::write(&p_env, r#"{"share_count": {"window_days": 5}}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(load_config_default(None).unwrap().share_count.window_days, 5);

    // 4) Explicit flag wins over env
    let p_flag = tmp.path().join("flag.toml");
    fs::write(&p_flag, "[share_count]\nwindow_days = 9\n").unwrap();
    assert_eq!(
        load_config_default(Some(&p_flag)).unwrap().share_count.window_days,
        9
    );

    // 5) Env pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_config_default(None).is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}
