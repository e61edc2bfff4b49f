use tracing_subscriber::EnvFilter;

const ENABLED_PACKS_ENV_VAR: &str = "RESPACK_ENABLED_PACKS";

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_enabled_packs_from_env() -> Vec<String> {
    std::env::var(ENABLED_PACKS_ENV_VAR)
        .ok()
        .map(|raw| parse_pack_list(&raw))
        .unwrap_or_default()
}

fn parse_pack_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}
