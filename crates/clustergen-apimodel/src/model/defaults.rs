use super::{
    AgentPoolProfile, ApiModel, AvailabilityProfile, MasterProfile, OrchestratorType,
    StorageProfile,
};

pub const DEFAULT_API_VERSION: &str = "vlabs";
pub const DEFAULT_ORCHESTRATOR_TYPE: OrchestratorType = OrchestratorType::Kubernetes;
pub const DEFAULT_MASTER_COUNT: u32 = 1;
pub const DEFAULT_VM_SIZE: &str = "Standard_D2_v3";
pub const DEFAULT_OS_DISK_SIZE_GB: u32 = 30;
pub const DEFAULT_STORAGE_PROFILE: StorageProfile = StorageProfile::ManagedDisks;
pub const DEFAULT_MASTER_AVAILABILITY_PROFILE: AvailabilityProfile =
    AvailabilityProfile::AvailabilitySet;
pub const DEFAULT_AGENT_AVAILABILITY_PROFILE: AvailabilityProfile =
    AvailabilityProfile::VirtualMachineScaleSets;

impl ApiModel {
    /// Fills in every setting the user did not specify. Values which are
    /// already set are never changed, so calling this repeatedly is a no-op.
    pub fn set_defaults(&mut self) {
        if self.api_version.is_empty() {
            DEFAULT_API_VERSION.clone_into(&mut self.api_version);
        }

        let properties = &mut self.properties;
        properties
            .orchestrator_profile
            .orchestrator_type
            .get_or_insert(DEFAULT_ORCHESTRATOR_TYPE);

        properties.master_profile.set_defaults();
        for pool in &mut properties.agent_pool_profiles {
            pool.set_defaults();
        }
    }
}

impl MasterProfile {
    fn set_defaults(&mut self) {
        self.count.get_or_insert(DEFAULT_MASTER_COUNT);
        self.vm_size.get_or_insert_with(|| DEFAULT_VM_SIZE.to_owned());
        self.os_disk_size_gb.get_or_insert(DEFAULT_OS_DISK_SIZE_GB);
        self.storage_profile.get_or_insert(DEFAULT_STORAGE_PROFILE);
        self.availability_profile
            .get_or_insert(DEFAULT_MASTER_AVAILABILITY_PROFILE);
    }
}

impl AgentPoolProfile {
    // The count has no default, every pool has to be sized explicitly
    fn set_defaults(&mut self) {
        self.vm_size.get_or_insert_with(|| DEFAULT_VM_SIZE.to_owned());
        self.os_disk_size_gb.get_or_insert(DEFAULT_OS_DISK_SIZE_GB);
        self.storage_profile.get_or_insert(DEFAULT_STORAGE_PROFILE);
        self.availability_profile
            .get_or_insert(DEFAULT_AGENT_AVAILABILITY_PROFILE);
    }
}
