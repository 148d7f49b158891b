#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

impl CargoEnv {
    pub fn name(&self) -> &'static str {
        match self {
            CargoEnv::Development => "development",
            CargoEnv::Production => "production",
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    // address the relay binds to, playlists point the player back at it
    #[clap(long, env, default_value = "127.0.0.1")]
    pub host: String,

    #[clap(long, env, default_value = "8080")]
    pub port: u16,

    // provider account
    #[clap(long, env, default_value = "")]
    pub username: String,

    #[clap(long, env, default_value = "")]
    pub password: String,

    // service id like viewstvn or viewmmasr, anything containing "mma" authenticates against
    // the mma login form instead of the hash api
    #[clap(long, env, default_value = "viewstvn")]
    pub service: String,

    // server prefix, dnae1 / deu / dap etc
    #[clap(long, env, default_value = "dnae1")]
    pub server: String,

    #[clap(long, env, default_value = "1")]
    pub quality: String,

    // chrono strftime pattern put in front of every event in /sports.m3u8, the player can
    // override it with ?format=
    #[clap(long, env, default_value = "%H:%M ")]
    pub time_format: String,

    // answer channel selections with a redirect instead of proxying the upstream playlist
    #[clap(long, env, default_value_t = false)]
    pub redirect_channels: bool,

    // the hash api drops the base64 padding the stream servers expect back on wmsAuthSign
    #[clap(long, env, default_value = "==")]
    pub signature_suffix: String,

    // optional webhook that receives the "now serving" notifications
    #[clap(long, env)]
    pub notify_url: Option<String>,

    // upstream endpoints, only worth overriding for testing or if the provider moves things
    #[clap(long, env, default_value = "https://auth.smoothstreams.tv/hash_api.php")]
    pub auth_url: String,

    #[clap(long, env, default_value = "https://www.mma-tv.net/loginForm.php")]
    pub mma_auth_url: String,

    #[clap(long, env, default_value = "https://fast-guide.smoothstreams.tv/altepg/channels.json")]
    pub channels_url: String,

    #[clap(long, env, default_value = "https://fast-guide.smoothstreams.tv/feed.json")]
    pub feed_url: String,

    #[clap(long, env, default_value = "https://fast-guide.smoothstreams.tv/altepg/xmltv1.xml")]
    pub epg_url: String,

    #[clap(long, env, default_value = "https://fast-guide.smoothstreams.tv/feed.xml")]
    pub sports_epg_url: String,

    #[clap(
        long,
        env,
        default_value = "https://guide.smoothstreams.tv/assets/images/channels/{channel}.png"
    )]
    pub logo_url_template: String,

    #[clap(
        long,
        env,
        default_value = "https://{server}.smoothstreams.tv/{service}/ch{channel}q{quality}.stream"
    )]
    pub stream_url_template: String,

    // feed times are published in the provider's local time without an offset
    #[clap(long, env, default_value = "-04:00")]
    pub feed_utc_offset: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            username: self.username.clone(),
            password: self.password.clone(),
            service: self.service.clone(),
            server: self.server.clone(),
            quality: self.quality.clone(),
        }
    }
}

impl Default for AppConfig {
    // mirrors the clap defaults so tests can build a config without parsing args
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            host: "127.0.0.1".to_string(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            service: "viewstvn".to_string(),
            server: "dnae1".to_string(),
            quality: "1".to_string(),
            time_format: "%H:%M ".to_string(),
            redirect_channels: false,
            signature_suffix: "==".to_string(),
            notify_url: None,
            auth_url: "https://auth.smoothstreams.tv/hash_api.php".to_string(),
            mma_auth_url: "https://www.mma-tv.net/loginForm.php".to_string(),
            channels_url: "https://fast-guide.smoothstreams.tv/altepg/channels.json".to_string(),
            feed_url: "https://fast-guide.smoothstreams.tv/feed.json".to_string(),
            epg_url: "https://fast-guide.smoothstreams.tv/altepg/xmltv1.xml".to_string(),
            sports_epg_url: "https://fast-guide.smoothstreams.tv/feed.xml".to_string(),
            logo_url_template: "https://guide.smoothstreams.tv/assets/images/channels/{channel}.png"
                .to_string(),
            stream_url_template:
                "https://{server}.smoothstreams.tv/{service}/ch{channel}q{quality}.stream"
                    .to_string(),
            feed_utc_offset: "-04:00".to_string(),
            sentry_dsn: None,
        }
    }
}

/// The part of the configuration that can change while the relay is running. Swapping it
/// always goes through `RelayServices::reconfigure` so the cached token is dropped with it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub username: String,
    pub password: String,
    pub service: String,
    pub server: String,
    pub quality: String,
}
