use std::{fs, sync::Arc};

use tracing::{info, warn};

use batchrun_core::{Launcher, LauncherConfig, ResourcePool};
use batchrun_discover::{DiscoverConfig, discover_resources};
use batchrun_exec::ShellRunner;
use batchrun_model::{ResourceToken, TaskSpec};
use batchrun_observe::{LoggerConfig, logger_init};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let cfg = LoggerConfig::default().with_level("info");
    logger_init(&cfg)?;
    info!("logger initialized");

    // 2) Resources: one slot per 4 GiB of free GPU memory, or three fake slots without a GPU
    let tokens = match discover_resources(&DiscoverConfig::new(4096)).await {
        Ok(tokens) if !tokens.is_empty() => tokens,
        Ok(_) => {
            warn!("no GPU has enough free memory; using fake slots");
            fake_slots()
        }
        Err(e) => {
            warn!(error = %e, "GPU discovery failed; using fake slots");
            fake_slots()
        }
    };
    let pool = ResourcePool::new(tokens)?;
    info!(capacity = pool.capacity(), "resource pool ready");

    // 3) Tasks
    let root = std::env::temp_dir().join("batchrun-demo");
    let tasks = (0..5)
        .map(|i| {
            let io_dir = root.join(i.to_string());
            let staged = io_dir.clone();
            TaskSpec::new(
                format!("echo task {i} on $CUDA_VISIBLE_DEVICES; sleep {}", i % 3),
                ".",
                io_dir,
            )
            .with_pre_hook(move || {
                fs::create_dir_all(&staged)?;
                Ok(())
            })
        })
        .collect();

    // 4) Run
    let launcher = Launcher::with_config(pool, Arc::new(ShellRunner::new()), LauncherConfig::default());
    let report = launcher.run(tasks).await;

    println!("{report}");
    info!(io = %root.display(), "outputs written");
    Ok(())
}

fn fake_slots() -> Vec<ResourceToken> {
    (0u32..3).map(ResourceToken::from).collect()
}
