//! Hand-off block (HOB) list.
//!
//! The list is the only product of the early boot phase: an ordered record
//! of system memory, reserved memory, firmware allocations and firmware
//! volumes that later boot stages consume read-only.

#![cfg_attr(not(test), no_std)]

pub use self::{
    encode::{HandoffInfo, HobType},
    error::HobError,
    guid::{FDT_HOB_GUID, Guid},
    hob::{Hob, MemoryType, ResourceAttributes, ResourceType},
    list::{HobBuilder, HobList},
};

mod encode;
mod error;
mod guid;
mod hob;
mod list;
