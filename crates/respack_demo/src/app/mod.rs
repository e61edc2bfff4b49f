mod bootstrap;
mod locks;
mod reloaders;

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use respack::{
    task_queue, DirectoryPack, DirectoryPackProvider, InsertionPosition, Pack, PackDescriptor,
    PackManager, PackProvider, ReloadConfig, ReloadOrchestrator, ReloadableResourceManager,
    ResourceType, SinglePreparation, StaticPackProvider, Synchronous, TaskExecutor,
};
use tracing::{error, info, warn};

use self::bootstrap::{init_tracing, parse_enabled_packs_from_env};
use self::reloaders::{LanguageTable, PackSummary, TextureIndex};

const BUILTIN_PACK_NAME: &str = "builtin";
const MAIN_LOOP_TICK: Duration = Duration::from_millis(5);
const PROGRESS_LOG_STEP: f32 = 0.1;

pub(crate) fn run() -> ExitCode {
    init_tracing();
    info!("=== respack demo startup ===");

    let paths = match respack::resolve_pack_paths() {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("respack-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "runtime_start_failed");
            return ExitCode::FAILURE;
        }
    };

    let builtin_dir = paths.builtin_dir.clone();
    let builtin = PackDescriptor::new(BUILTIN_PACK_NAME, move || {
        Ok(Arc::new(DirectoryPack::new(BUILTIN_PACK_NAME, builtin_dir.clone())) as Arc<dyn Pack>)
    })
    .with_title("Builtin")
    .with_description("Content shipped with the demo")
    .always_enabled()
    .pinned()
    .at(InsertionPosition::Bottom);
    let providers: Vec<Box<dyn PackProvider>> = vec![
        Box::new(StaticPackProvider::new(BUILTIN_PACK_NAME, vec![builtin])),
        Box::new(DirectoryPackProvider::new(paths.resource_packs_dir.clone())),
    ];
    let mut pack_manager = PackManager::new(providers);
    if let Err(err) = pack_manager.rescan() {
        error!(error = %err, "pack_scan_failed");
        return ExitCode::FAILURE;
    }
    let requested = parse_enabled_packs_from_env();
    for name in &requested {
        if !pack_manager.has_descriptor(name) {
            warn!(pack = %name, available = ?pack_manager.available_names(), "requested_pack_unknown");
        }
    }
    pack_manager.set_enabled(&requested);
    info!(
        enabled = ?pack_manager.enabled_names(),
        enabled_packs_hash = %pack_manager.enabled_fingerprint(),
        "packs_enabled"
    );

    let language = Arc::new(LanguageTable::default());
    let textures = Arc::new(TextureIndex::default());
    let summary = Arc::new(PackSummary::default());
    let resources =
        ReloadableResourceManager::new(ResourceType::ClientResources, ReloadConfig::from_env());
    resources.register_reloader(Arc::new(SinglePreparation(Arc::clone(&language))));
    resources.register_reloader(textures.clone());
    resources.register_reloader(Arc::new(Synchronous(Arc::clone(&summary))));

    // Apply work runs on this thread, drained once per loop tick.
    let (apply, apply_queue) = task_queue();
    let driver = runtime.handle().clone();
    let prepare: Arc<dyn TaskExecutor> = Arc::new(driver.clone());
    let orchestrator = ReloadOrchestrator::new(driver, prepare, Arc::new(apply));

    let handle = resources.rescan_and_reload(&orchestrator, &mut pack_manager, async {});

    let mut last_logged = 0.0f32;
    while !handle.is_complete() {
        let ran = apply_queue.run_pending();
        let progress = handle.progress();
        if progress - last_logged >= PROGRESS_LOG_STEP {
            info!(
                percent = (progress * 100.0).round() as u32,
                applied_tasks = ran,
                "reload_progress"
            );
            last_logged = progress;
        }
        thread::sleep(MAIN_LOOP_TICK);
    }
    apply_queue.run_pending();

    if let Err(err) = runtime.block_on(handle.await_completion()) {
        error!(error = %err, "reload_failed");
        resources.close();
        return ExitCode::FAILURE;
    }

    info!(
        language_entries = language.len(),
        greeting = %language.get("menu.greeting").unwrap_or_default(),
        textures = textures.len(),
        namespaces = ?summary.namespaces(),
        "reload_complete"
    );
    resources.close();
    ExitCode::SUCCESS
}
