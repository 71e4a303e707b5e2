use arrayvec::ArrayVec;
use log::{info, warn};
use pei_params::MAX_HARTS;
use sbi_call::{HardwareCall, HartState, SbiError};

use crate::PeiError;

/// Outcome of [`start_secondary_harts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HartStartReport {
    pub started: ArrayVec<usize, MAX_HARTS>,
    pub failed: ArrayVec<(usize, SbiError), MAX_HARTS>,
    /// Harts beyond [`MAX_HARTS`] that were left parked.
    pub ignored: usize,
}

impl HartStartReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.ignored == 0
    }
}

/// Starts every hart in `hart_ids` except the boot hart.
///
/// Each hart enters `entry` with its ID in `a0` and `opaque(hart_id)` in
/// `a1`. A hart that is already running is counted as started and left
/// alone. A hart that fails to start is recorded in the report and the
/// remaining harts are still started.
///
/// Fails with [`SbiError::NotSupported`] if the machine has no hart state
/// management; no hart is started then.
pub fn start_secondary_harts<H, I, F>(
    hw: &H,
    hart_ids: I,
    entry: usize,
    mut opaque: F,
) -> Result<HartStartReport, PeiError>
where
    H: HardwareCall + ?Sized,
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> usize,
{
    let boot_hart_id = hw.boot_hart_id();
    let mut report = HartStartReport::default();

    for hart_id in hart_ids.into_iter().filter(|&id| id != boot_hart_id) {
        if report.started.len() + report.failed.len() >= MAX_HARTS - 1 {
            warn!("hart {hart_id} exceeds the supported hart count");
            report.ignored += 1;
            continue;
        }
        match hw.hart_status(hart_id) {
            Ok(HartState::Started | HartState::StartPending) => {
                info!("hart {hart_id} is already running");
                report.started.push(hart_id);
                continue;
            }
            Ok(_) => {}
            Err(SbiError::NotSupported) => {
                warn!("hart state management is not available");
                return Err(SbiError::NotSupported.into());
            }
            Err(e) => warn!("cannot get the state of hart {hart_id}: {e}"),
        }
        match hw.start_hart(hart_id, entry, opaque(hart_id)) {
            Ok(()) => {
                info!("started hart {hart_id}");
                report.started.push(hart_id);
            }
            Err(e) => {
                warn!("failed to start hart {hart_id}: {e}");
                report.failed.push((hart_id, e));
            }
        }
    }
    Ok(report)
}
