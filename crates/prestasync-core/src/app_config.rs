#[derive(Clone)]
pub struct AppConfig {
    /// Base URL of the PrestaShop store, e.g. `https://shop.example.com`.
    /// The client appends `/api/...` paths to it.
    pub prestashop_url: String,
    /// Webservice key appended as `ws_key` to every source request.
    pub prestashop_ws_key: String,
    /// Target catalog database. Optional so that dry runs against the
    /// in-memory store work without one; the CLI errors when it is needed.
    pub database_url: Option<String>,
    pub log_level: String,
    /// When set, product handles are always re-slugified from the product
    /// name instead of reusing the source `link_rewrite`.
    pub generate_new_handles: bool,
    /// Directory image uploads are written to by the local file store.
    pub upload_dir: std::path::PathBuf,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("prestashop_url", &self.prestashop_url)
            .field("prestashop_ws_key", &"[redacted]")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("generate_new_handles", &self.generate_new_handles)
            .field("upload_dir", &self.upload_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
