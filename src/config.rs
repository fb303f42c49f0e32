#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5052")]
    pub port: u16,

    // absolute prefix put in front of rewritten proxy urls, like https://relay.example.com
    // leave it out and manifests get root relative urls which most players resolve fine
    #[clap(long, env)]
    pub public_url: Option<String>,

    // redis url for mirroring tokens across restarts, the relay works without it
    #[clap(long, env)]
    pub redis_url: Option<String>,

    // json channel directory, shaped like {"data": [...]}
    #[clap(long, env, default_value = "data/channels.json")]
    pub channels_file: String,

    // 12 hours, tokens are assumed to live at least this long upstream
    #[clap(long, env, default_value = "43200")]
    pub token_ttl_seconds: u64,

    // page that hands out a token when hit with a browser user agent
    #[clap(long, env)]
    pub token_source_url: String,

    // pulls the token out of the token source body, the whole match is used
    #[clap(long, env, default_value = r#"hdntl=[^\s"'<>]+"#)]
    pub token_pattern: String,

    #[clap(long, env, default_value = "30")]
    pub upstream_timeout_seconds: u64,

    // the cdn refuses requests without these
    #[clap(long, env)]
    pub upstream_origin: String,

    #[clap(long, env)]
    pub upstream_referer: String,

    #[clap(long, env, default_value = "en-US,en;q=0.9")]
    pub upstream_accept_language: String,

    // used when a client doesn't send a user agent at all
    #[clap(
        long,
        env,
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    )]
    pub default_user_agent: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    /// prefix every rewritten manifest line points at
    pub fn proxy_base(&self) -> String {
        let host = self
            .public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or("");

        format!("{}/api/v1/proxy", host)
    }
}

impl Default for AppConfig {
    // defaults aren't really needed here but it's here as a bad fallback (and for tests)
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5052,
            public_url: None,
            redis_url: None,
            channels_file: "data/channels.json".to_string(),
            token_ttl_seconds: 43200,
            token_source_url: "https://example.com/token".to_string(),
            token_pattern: r#"hdntl=[^\s"'<>]+"#.to_string(),
            upstream_timeout_seconds: 30,
            upstream_origin: "https://example.com".to_string(),
            upstream_referer: "https://example.com/".to_string(),
            upstream_accept_language: "en-US,en;q=0.9".to_string(),
            default_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            sentry_dsn: None,
        }
    }
}
