//! System memory discovery from the device tree.

use fdt_blob::{DeviceTree, Node};
use log::{error, info, warn};
use sbi_call::HardwareCall;

use crate::{MemoryRegion, PeiError, SystemMemoryWindow};

fn is_memory_node(node: &Node<'_>) -> bool {
    node.property("device_type")
        .and_then(|p| p.as_str())
        .is_some_and(|ty| ty == "memory")
}

/// Reads a `reg` property made of exactly one 64-bit `(base, size)` pair.
fn reg_region(node: &Node<'_>) -> Option<MemoryRegion> {
    let (base, size) = node.property("reg")?.reg_pair()?;
    Some(MemoryRegion::new(base, size))
}

/// Finds the lowest-based system memory region and the M-mode reserved region.
///
/// Every `device_type = "memory"` node is visited once in document order.
/// Nodes whose `reg` is not a single 64-bit pair are skipped. If no memory
/// node is usable the system memory region is empty, and if the node at
/// `reserved_path` is absent or malformed the reserved region is empty.
#[must_use]
pub fn scan(tree: &DeviceTree<'_>, reserved_path: &str) -> SystemMemoryWindow {
    let mut lowest: Option<MemoryRegion> = None;
    for node in tree.nodes().filter(is_memory_node) {
        let Some(region) = reg_region(&node) else {
            warn!("failed to parse memory node {}", node.name());
            continue;
        };
        info!(
            "system RAM @ {:#x} - {:#x}",
            region.base,
            region.base.wrapping_add(region.size).wrapping_sub(1)
        );
        if lowest.is_none_or(|lowest| region.base < lowest.base) {
            lowest = Some(region);
        }
    }

    let system = lowest.unwrap_or_else(|| {
        warn!("no memory node found");
        MemoryRegion::EMPTY
    });

    let reserved = match tree.find_node(reserved_path) {
        Some(node) => reg_region(&node).unwrap_or_else(|| {
            warn!("failed to parse reserved memory node {reserved_path}");
            MemoryRegion::EMPTY
        }),
        None => MemoryRegion::EMPTY,
    };
    if !reserved.is_empty() {
        info!(
            "M-mode base = {:#x}, M-mode size = {:#x}",
            reserved.base, reserved.size
        );
    }

    info!(
        "system memory base = {:#x}, size = {:#x}",
        system.base, system.size
    );
    SystemMemoryWindow::new(system, reserved)
}

/// Validates the device tree at `blob` and scans it.
///
/// # Safety
///
/// A non-null `blob` must point to a device tree that stays readable and
/// unmodified for the duration of the call.
pub unsafe fn scan_blob(
    blob: *const u8,
    reserved_path: &str,
) -> Result<SystemMemoryWindow, PeiError> {
    if blob.is_null() {
        error!("invalid device tree pointer");
        return Err(PeiError::Unsupported);
    }
    let tree = unsafe { DeviceTree::from_ptr(blob) }.inspect_err(|e| {
        error!("invalid device tree: {e}");
    })?;
    Ok(scan(&tree, reserved_path))
}

/// Scans the device tree named by the registered firmware context record.
///
/// # Safety
///
/// A non-null context pointer must point to a valid [`FirmwareContext`], and
/// its device tree address must satisfy the contract of [`scan_blob`].
///
/// [`FirmwareContext`]: sbi_call::FirmwareContext
pub unsafe fn scan_context<H>(hw: &H, reserved_path: &str) -> Result<SystemMemoryWindow, PeiError>
where
    H: HardwareCall + ?Sized,
{
    let context = hw.context_pointer();
    if context.is_null() {
        error!("firmware context is null");
        return Err(PeiError::NotFound);
    }
    let fdt = unsafe { (*context).flattened_device_tree };
    let Ok(fdt) = usize::try_from(fdt) else {
        error!("device tree address {fdt:#x} is out of range");
        return Err(PeiError::Unsupported);
    };
    unsafe { scan_blob(core::ptr::with_exposed_provenance(fdt), reserved_path) }
}

/// Returns the IDs of the harts described under `/cpus`.
pub fn hart_ids<'a>(tree: &DeviceTree<'a>) -> impl Iterator<Item = usize> + 'a {
    tree.find_node("/cpus")
        .into_iter()
        .flat_map(|cpus| cpus.children())
        .filter(|node| node.unit_name() == "cpu")
        .filter_map(|node| {
            let reg = node.property("reg")?;
            let id = reg.as_u32().map(u64::from).or_else(|| reg.as_u64())?;
            usize::try_from(id).ok()
        })
}

#[cfg(test)]
mod tests {
    use core::{cell::Cell, ptr};

    use fdt_blob::builder::FdtBuilder;
    use sbi_call::{FirmwareContext, HartState, SbiError};

    use super::*;

    const RESV_PATH: &str = "/reserved-memory/mmode_resv0";

    fn blob(memory: &[(u64, u64)], reserved: Option<(u64, u64)>) -> Vec<u8> {
        let mut b = FdtBuilder::new();
        b.begin_node("")
            .property_u32("#address-cells", 2)
            .property_u32("#size-cells", 2);
        for &(base, size) in memory {
            b.begin_node(&format!("memory@{base:x}"))
                .property_str("device_type", "memory")
                .property_reg(&[(base, size)])
                .end_node();
        }
        if let Some((base, size)) = reserved {
            b.begin_node("reserved-memory");
            b.begin_node(&format!("mmode_resv0@{base:x}"))
                .property_reg(&[(base, size)])
                .end_node();
            b.end_node();
        }
        b.end_node();
        b.finish()
    }

    fn scan_bytes(blob: &[u8]) -> SystemMemoryWindow {
        scan(&DeviceTree::from_bytes(blob).unwrap(), RESV_PATH)
    }

    #[test]
    fn malformed_reserved_node_is_empty() {
        let mut b = FdtBuilder::new();
        b.begin_node("")
            .property_u32("#address-cells", 2)
            .property_u32("#size-cells", 2);
        b.begin_node("memory@80000000")
            .property_str("device_type", "memory")
            .property_reg(&[(0x8000_0000, 0x4000_0000)])
            .end_node();
        b.begin_node("reserved-memory");
        // base without a size
        b.begin_node("mmode_resv0@80000000")
            .property("reg", &0x8000_0000_u64.to_be_bytes())
            .end_node();
        b.end_node();
        b.end_node();

        let window = scan_bytes(&b.finish());
        assert_eq!(window.system_memory_base, 0x8000_0000);
        assert!(window.reserved().is_empty());
    }

    #[test]
    fn lowest_region_wins_regardless_of_order() {
        let regions = [
            (0x9000_0000, 0x4000_0000),
            (0x8000_0000, 0x4000_0000),
            (0xa000_0000, 0x1000_0000),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let memory = order.map(|i| regions[i]);
            let window = scan_bytes(&blob(&memory, None));
            assert_eq!(window.system_memory_base, 0x8000_0000, "{order:?}");
            assert_eq!(window.system_memory_size, 0x4000_0000, "{order:?}");
        }
    }

    #[test]
    fn region_at_address_zero_is_a_candidate() {
        let window = scan_bytes(&blob(&[(0x8000_0000, 0x1000), (0, 0x2000)], None));
        assert_eq!(window.system_memory(), MemoryRegion::new(0, 0x2000));
    }

    #[test]
    fn reserved_region_is_read() {
        let window = scan_bytes(&blob(
            &[(0x8000_0000, 0x4000_0000)],
            Some((0x8200_0000, 0x4_0000)),
        ));
        assert_eq!(window.reserved(), MemoryRegion::new(0x8200_0000, 0x4_0000));
    }

    #[test]
    fn absent_reserved_region_is_empty() {
        let window = scan_bytes(&blob(&[(0x8000_0000, 0x4000_0000)], None));
        assert_eq!(window.mmode_resv_base, 0);
        assert_eq!(window.mmode_resv_size, 0);
    }

    #[test]
    fn malformed_memory_nodes_are_skipped() {
        let mut b = FdtBuilder::new();
        b.begin_node("");
        b.begin_node("memory@40000000")
            .property_str("device_type", "memory")
            .property("reg", &[0; 8])
            .end_node();
        b.begin_node("memory@50000000")
            .property_str("device_type", "memory")
            .end_node();
        b.begin_node("memory@60000000")
            .property_str("device_type", "memory")
            .property_reg(&[(0x6000_0000, 0x100), (0x7000_0000, 0x100)])
            .end_node();
        b.begin_node("memory@80000000")
            .property_str("device_type", "memory")
            .property_reg(&[(0x8000_0000, 0x1000_0000)])
            .end_node();
        b.begin_node("flash@20000000")
            .property_str("device_type", "flash")
            .property_reg(&[(0x2000_0000, 0x100_0000)])
            .end_node();
        b.end_node();
        let window = scan_bytes(&b.finish());
        assert_eq!(
            window.system_memory(),
            MemoryRegion::new(0x8000_0000, 0x1000_0000)
        );
    }

    #[test]
    fn no_memory_node_gives_empty_window() {
        let window = scan_bytes(&blob(&[], None));
        assert!(window.system_memory().is_empty());
    }

    #[test]
    fn rescan_is_idempotent() {
        let blob = blob(
            &[(0x9000_0000, 0x1000), (0x8000_0000, 0x4000_0000)],
            Some((0x8100_0000, 0x8_0000)),
        );
        let tree = DeviceTree::from_bytes(&blob).unwrap();
        assert_eq!(scan(&tree, RESV_PATH), scan(&tree, RESV_PATH));
    }

    #[test]
    fn null_blob_is_unsupported() {
        let res = unsafe { scan_blob(ptr::null(), RESV_PATH) };
        assert_eq!(res, Err(PeiError::Unsupported));
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        let mut blob = blob(&[(0x8000_0000, 0x1000)], None);
        blob[0] ^= 0xff;
        let res = unsafe { scan_blob(blob.as_ptr(), RESV_PATH) };
        assert!(matches!(res, Err(PeiError::InvalidBlob(_))));
    }

    struct ContextOnly(Cell<*mut FirmwareContext>);

    impl HardwareCall for ContextOnly {
        fn boot_hart_id(&self) -> usize {
            0
        }

        fn start_hart(&self, _: usize, _: usize, _: usize) -> Result<(), SbiError> {
            Err(SbiError::NotSupported)
        }

        fn hart_status(&self, _: usize) -> Result<HartState, SbiError> {
            Err(SbiError::NotSupported)
        }

        fn context_pointer(&self) -> *mut FirmwareContext {
            self.0.get()
        }

        fn set_context_pointer(&self, context: *mut FirmwareContext) {
            self.0.set(context);
        }
    }

    #[test]
    fn scan_through_context() {
        let blob = blob(&[(0x8000_0000, 0x4000_0000)], None);
        let mut context = FirmwareContext::new(0, blob.as_ptr().expose_provenance() as u64);
        let hw = ContextOnly(Cell::new(&raw mut context));
        let window = unsafe { scan_context(&hw, RESV_PATH) }.unwrap();
        assert_eq!(window.system_memory_base, 0x8000_0000);
    }

    #[test]
    fn missing_context_or_blob() {
        let hw = ContextOnly(Cell::new(ptr::null_mut()));
        assert_eq!(
            unsafe { scan_context(&hw, RESV_PATH) },
            Err(PeiError::NotFound)
        );

        let mut context = FirmwareContext::new(0, 0);
        hw.set_context_pointer(&raw mut context);
        assert_eq!(
            unsafe { scan_context(&hw, RESV_PATH) },
            Err(PeiError::Unsupported)
        );
    }

    #[test]
    fn hart_ids_from_cpus_node() {
        let mut b = FdtBuilder::new();
        b.begin_node("");
        b.begin_node("cpus")
            .property_u32("#address-cells", 1)
            .property_u32("#size-cells", 0);
        for id in [0, 1, 3] {
            b.begin_node(&format!("cpu@{id}"))
                .property_str("device_type", "cpu")
                .property_u32("reg", id)
                .end_node();
        }
        b.begin_node("cpu-map").end_node();
        b.end_node();
        b.end_node();
        let blob = b.finish();
        let tree = DeviceTree::from_bytes(&blob).unwrap();
        assert_eq!(hart_ids(&tree).collect::<Vec<_>>(), [0, 1, 3]);
    }
}
