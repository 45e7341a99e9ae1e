/// Default head-room (MiB) that must stay free on a device after the last slot is carved out.
pub const DEFAULT_RESERVE_MIB: u64 = 20;

#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    /// Memory one task needs on a device, in MiB.
    pub memory_requirement_mib: u64,
    pub reserve_mib: u64,
    /// Binary queried for free memory.
    pub program: String,
}

impl DiscoverConfig {
    pub fn new(memory_requirement_mib: u64) -> Self {
        Self {
            memory_requirement_mib,
            reserve_mib: DEFAULT_RESERVE_MIB,
            program: "nvidia-smi".to_string(),
        }
    }

    pub fn with_reserve(mut self, reserve_mib: u64) -> Self {
        self.reserve_mib = reserve_mib;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}
