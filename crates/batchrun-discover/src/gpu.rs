use std::{cmp::Reverse, collections::BinaryHeap};

use tokio::process::Command;
use tracing::{debug, info};

use batchrun_model::ResourceToken;

use crate::{config::DiscoverConfig, errors::DiscoverError};

/// Ask the GPU driver how much memory is free and turn it into pool tokens.
///
/// A device with room for several tasks contributes its index several times.
pub async fn discover_resources(cfg: &DiscoverConfig) -> Result<Vec<ResourceToken>, DiscoverError> {
    let output = Command::new(&cfg.program)
        .args(["--query-gpu=memory.free", "--format=csv,noheader,nounits"])
        .output()
        .await
        .map_err(|source| DiscoverError::Spawn {
            program: cfg.program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(DiscoverError::Failed {
            program: cfg.program.clone(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let free = parse_free_memory(&String::from_utf8_lossy(&output.stdout))?;
    debug!(target: "batchrun.discover", ?free, "free memory per device (MiB)");

    let slots = allocate_slots(&free, cfg.memory_requirement_mib, cfg.reserve_mib);
    info!(
        target: "batchrun.discover",
        devices = free.len(),
        slots = slots.len(),
        requirement_mib = cfg.memory_requirement_mib,
        "resources discovered"
    );
    Ok(slots.into_iter().map(ResourceToken::from).collect())
}

/// One free-MiB value per non-empty line, in device order.
pub fn parse_free_memory(stdout: &str) -> Result<Vec<u64>, DiscoverError> {
    stdout
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            l.split_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| DiscoverError::Parse {
                    line: i + 1,
                    content: l.to_string(),
                })
        })
        .collect()
}

/// Greedily carve `requirement` MiB slots out of the device with the most free memory
/// until none can fit one and still keep `reserve` MiB spare. Ties go to the lower index.
pub fn allocate_slots(free_mib: &[u64], requirement: u64, reserve: u64) -> Vec<u32> {
    if requirement == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<(u64, Reverse<u32>)> = free_mib
        .iter()
        .enumerate()
        .map(|(idx, &free)| (free, Reverse(idx as u32)))
        .collect();

    let mut slots = Vec::new();
    while let Some(mut top) = heap.peek_mut() {
        let (free, Reverse(idx)) = *top;
        if free < requirement.saturating_add(reserve) {
            break;
        }
        top.0 = free - requirement;
        slots.push(idx);
    }
    slots
}
