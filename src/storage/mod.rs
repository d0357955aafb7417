//! Storage-netfn command groups: the SDR repository and the system event
//! log.

pub mod sdr;
pub mod sel;

use crate::wire::{Decode, Reader};

/// An opaque cookie from Reserve-SDR/Reserve-SEL. It must accompany every
/// partial read so the BMC can invalidate in-flight cursors when the
/// repository changes underneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationId(pub u16);

impl Decode for ReservationId {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self(r.read_u16())
    }
}
