//! Environment-driven Settings
//!
//! Lives in its own test binary: it mutates process environment variables,
//! which must not race with other tests. Keep a single test in this file.

use std::env;
use std::time::Duration;

use capsule_cache::Settings;

#[test]
fn test_settings_from_env_overrides_and_fallbacks() {
    env::remove_var("CACHE_TTL_SECS");
    env::set_var("CACHE_SWR_SECS", "not-a-number");
    env::set_var("CACHE_QUOTA_MB", "8");
    env::set_var("CACHE_MAX_BODY_BYTES", "0");
    env::set_var("SERVER_PORT", "8081");

    let settings = Settings::from_env();
    assert_eq!(settings.ttl_secs, 300);
    assert_eq!(settings.swr_secs, 60);
    assert_eq!(settings.quota_mb, 8);
    assert_eq!(settings.max_body_bytes, 0);
    assert_eq!(settings.server_port, 8081);

    let config = settings.cache_config();
    assert_eq!(config.default_ttl, Duration::from_secs(300));
    assert_eq!(config.body_cap(), None);

    for name in [
        "CACHE_SWR_SECS",
        "CACHE_QUOTA_MB",
        "CACHE_MAX_BODY_BYTES",
        "SERVER_PORT",
    ] {
        env::remove_var(name);
    }
}
