use hob_list::{HobBuilder, MemoryType};
use log::{error, info, warn};

use crate::{MemoryRegion, PeiError};

/// Publishes firmware volumes so later boot stages can load modules from them.
///
/// Each volume is first allocated as boot services data, then announced.
/// Empty volumes are skipped. Overlapping volumes are rejected before
/// anything is appended.
pub fn publish_firmware_volumes<B>(
    volumes: &[MemoryRegion],
    builder: &mut B,
) -> Result<(), PeiError>
where
    B: HobBuilder + ?Sized,
{
    for (i, volume) in volumes.iter().enumerate() {
        volume.end()?;
        if let Some(other) = volumes[..i].iter().find(|other| other.overlaps(volume)) {
            error!("firmware volume {volume:?} overlaps {other:?}");
            return Err(PeiError::OverlappingAllocation {
                base: volume.base,
                size: volume.size,
            });
        }
    }

    for volume in volumes {
        if volume.is_empty() {
            warn!("skipping empty firmware volume at {:#x}", volume.base);
            continue;
        }
        info!(
            "firmware volume @ {:#x}, size {:#x}",
            volume.base, volume.size
        );
        builder.append_memory_allocation(volume.base, volume.size, MemoryType::BootServicesData)?;
        builder.append_firmware_volume(volume.base, volume.size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hob_list::{Hob, HobError, HobList};

    use super::*;

    #[test]
    fn allocation_precedes_announcement() {
        let mut list = HobList::<8>::new();
        let volumes = [
            MemoryRegion::new(0x2000_0000, 0x20_0000),
            MemoryRegion::new(0x2020_0000, 0xe0_0000),
        ];
        publish_firmware_volumes(&volumes, &mut list).unwrap();
        assert_eq!(
            list.entries(),
            [
                Hob::MemoryAllocation {
                    base: 0x2000_0000,
                    len: 0x20_0000,
                    memory_type: MemoryType::BootServicesData,
                },
                Hob::FirmwareVolume {
                    base: 0x2000_0000,
                    len: 0x20_0000,
                },
                Hob::MemoryAllocation {
                    base: 0x2020_0000,
                    len: 0xe0_0000,
                    memory_type: MemoryType::BootServicesData,
                },
                Hob::FirmwareVolume {
                    base: 0x2020_0000,
                    len: 0xe0_0000,
                },
            ]
        );
    }

    #[test]
    fn empty_volume_is_skipped() {
        let mut list = HobList::<8>::new();
        let volumes = [
            MemoryRegion::new(0x2000_0000, 0),
            MemoryRegion::new(0x2000_0000, 0x1000),
        ];
        publish_firmware_volumes(&volumes, &mut list).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn overlapping_volumes_are_rejected() {
        let mut list = HobList::<8>::new();
        let volumes = [
            MemoryRegion::new(0x2000_0000, 0x20_0000),
            MemoryRegion::new(0x201f_0000, 0x1000),
        ];
        assert_eq!(
            publish_firmware_volumes(&volumes, &mut list),
            Err(PeiError::OverlappingAllocation {
                base: 0x201f_0000,
                size: 0x1000
            })
        );
        assert!(list.is_empty());
    }

    #[test]
    fn allocation_clash_with_existing_entries() {
        let mut list = HobList::<8>::new();
        list.append_memory_allocation(0x2000_0000, 0x1000, MemoryType::Reserved)
            .unwrap();
        let volumes = [MemoryRegion::new(0x2000_0000, 0x20_0000)];
        assert!(matches!(
            publish_firmware_volumes(&volumes, &mut list),
            Err(PeiError::Descriptor(HobError::OverlappingAllocation { .. }))
        ));
    }
}
