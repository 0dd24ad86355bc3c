//! CAN clock root and bit timing

use crate::{ral, Error, Result};

/// Bit segment lengths, in time quanta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSegments {
    pub prop_seg: u8,
    pub phase_seg1: u8,
    pub phase_seg2: u8,
    /// Synchronization jump width
    pub sjw: u8,
}

impl BitSegments {
    /// Decode the CMSIS `bit_segments` argument.
    pub const fn from_cmsis(bits: u32) -> Self {
        BitSegments {
            prop_seg: bits as u8,
            phase_seg1: (bits >> 8) as u8,
            phase_seg2: (bits >> 16) as u8,
            sjw: (bits >> 24) as u8,
        }
    }

    /// Time quanta per bit, including the sync segment.
    const fn quanta(&self) -> u32 {
        1 + self.prop_seg as u32 + self.phase_seg1 as u32 + self.phase_seg2 as u32
    }

    fn validate(&self) -> Result<()> {
        let prop_phase1 = self.prop_seg as u32 + self.phase_seg1 as u32;
        if self.prop_seg < 1 {
            Err(Error::InvalidPropSeg)
        } else if self.phase_seg1 < 1 {
            Err(Error::InvalidPhaseSeg1)
        } else if !(4..=16).contains(&prop_phase1) {
            Err(Error::InvalidPropSeg)
        } else if !(2..=8).contains(&self.phase_seg2) {
            Err(Error::InvalidPhaseSeg2)
        } else if !(1..=4).contains(&self.sjw) {
            Err(Error::InvalidSjw)
        } else {
            Ok(())
        }
    }
}

/// Segments used until the application selects a bitrate.
const DEFAULT_SEGMENTS: BitSegments = BitSegments {
    prop_seg: 2,
    phase_seg1: 4,
    phase_seg2: 3,
    sjw: 2,
};

/// Timing register values. Every field holds its length minus one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub pre_divider: u16,
    pub prop_seg: u8,
    pub phase_seg1: u8,
    pub phase_seg2: u8,
    pub rjump_width: u8,
}

impl Timing {
    fn new(pre_divider: u32, segments: &BitSegments) -> Self {
        Timing {
            pre_divider: pre_divider.saturating_sub(1) as u16,
            prop_seg: segments.prop_seg - 1,
            phase_seg1: segments.phase_seg1 - 1,
            phase_seg2: segments.phase_seg2 - 1,
            rjump_width: segments.sjw - 1,
        }
    }
}

/// Compute the timing that reaches `bitrate` from `clock_hz`.
///
/// `tolerance` is the accepted clock deviation, in 1/1024 units.
pub fn compute(
    clock_hz: u32,
    bitrate: u32,
    segments: &BitSegments,
    tolerance: u32,
) -> Result<Timing> {
    segments.validate()?;
    if clock_hz == 0 || bitrate == 0 {
        return Err(Error::Unspecified);
    }

    let quanta = segments.quanta();
    let pre_divider = (clock_hz / quanta) / bitrate;
    if pre_divider < 1 {
        return Err(Error::Unspecified);
    }

    let reached = pre_divider as u64 * quanta as u64 * bitrate as u64;
    let deviation = (clock_hz as u64).abs_diff(reached) * 1024 / clock_hz as u64;
    if deviation > tolerance as u64 {
        return Err(Error::InvalidBitrate);
    }

    Ok(Timing::new(pre_divider, segments))
}

/// Timing used when the controller powers up.
pub fn default(clock_hz: u32, bitrate: u32) -> Timing {
    let pre_divider = clock_hz / (bitrate.max(1) * DEFAULT_SEGMENTS.quanta());
    Timing::new(pre_divider, &DEFAULT_SEGMENTS)
}

/// CAN clock root frequency, derived from the CCM selection and divider.
pub fn clock(ccm: &ral::ccm::RegisterBlock, usb1_pll_hz: u32) -> u32 {
    use ral::ccm::CSCMR2::CAN_CLK_SEL::RW::*;

    let (select, podf) = ral::read_reg!(ral::ccm, ccm, CSCMR2, CAN_CLK_SEL, CAN_CLK_PODF);
    let root = match select {
        PLL3_DIV8 => usb1_pll_hz / 8,
        OSC => 24_000_000,
        PLL3_DIV6 => usb1_pll_hz / 6,
        _ => 0,
    };
    root / (podf + 1)
}
