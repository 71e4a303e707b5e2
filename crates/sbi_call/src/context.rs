/// Firmware context record.
///
/// Created by the entry code on the temporary stack and located through
/// [`HardwareCall::context_pointer`](crate::HardwareCall::context_pointer).
/// It moves together with the stack when the stack is relocated.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareContext {
    pub boot_hart_id: u64,
    /// Address of the PEI services table, 0 until one is installed.
    pub pei_service_table: usize,
    /// Address of the flattened device tree, 0 when none was passed.
    pub flattened_device_tree: u64,
}

impl FirmwareContext {
    #[must_use]
    pub const fn new(boot_hart_id: u64, flattened_device_tree: u64) -> Self {
        Self {
            boot_hart_id,
            pei_service_table: 0,
            flattened_device_tree,
        }
    }
}
