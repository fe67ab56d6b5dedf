//! Hardware information record from security register three.
//!
//! The factory stores the device name, the tuning ranges and the LCD
//! variant in the third security register. The name field is padded
//! with 0xFF, the band limits are packed BCD in hundreds of kHz.

use memory::codec::{bcd_to_bin, get_u16_le, get_u8};
use nvm::{NvmArea, NvmError};

/// Decoded hardware information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwInfo {
    /// Device name, NUL-padded.
    pub name: [u8; 8],
    /// LCD controller variant.
    pub hw_version: u8,
    /// Lower UHF tuning limit in MHz, zero when the band is absent.
    pub uhf_min_freq: u16,
    /// Upper UHF tuning limit in MHz.
    pub uhf_max_freq: u16,
    /// Lower VHF tuning limit in MHz, zero when the band is absent.
    pub vhf_min_freq: u16,
    /// Upper VHF tuning limit in MHz.
    pub vhf_max_freq: u16,
    /// UHF hardware present.
    pub uhf_band: bool,
    /// VHF hardware present.
    pub vhf_band: bool,
}

impl HwInfo {
    /// Device name as a string slice, trimmed at the first NUL.
    #[must_use]
    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

/// Read and decode the hardware record from security register three.
///
/// Single-band radios describe one band; which one is told from the
/// frequency range (below 200 MHz means VHF). Dual-band radios carry
/// both ranges.
///
/// # Errors
///
/// Propagates NVM read failures.
pub fn read_hw_info(sec3: &NvmArea, dual_band: bool) -> Result<HwInfo, NvmError> {
    let mut info = HwInfo::default();

    sec3.read(0x00, &mut info.name)?;
    // The name field is 0xFF-padded; scrub to NUL so it terminates.
    for b in &mut info.name {
        if *b == 0xFF {
            *b = 0;
        }
    }

    let mut word = [0u8; 2];
    sec3.read(0x14, &mut word)?;
    let freq_min = (bcd_to_bin(get_u16_le(&word) as u32) / 10) as u16;
    sec3.read(0x16, &mut word)?;
    let freq_max = (bcd_to_bin(get_u16_le(&word) as u32) / 10) as u16;

    let mut lcd_info = [0u8; 1];
    sec3.read(0x1D, &mut lcd_info)?;
    info.hw_version = get_u8(&lcd_info) & 0x03;

    if dual_band {
        sec3.read(0x18, &mut word)?;
        info.vhf_min_freq = (bcd_to_bin(get_u16_le(&word) as u32) / 10) as u16;
        sec3.read(0x1A, &mut word)?;
        info.vhf_max_freq = (bcd_to_bin(get_u16_le(&word) as u32) / 10) as u16;
        info.uhf_min_freq = freq_min;
        info.uhf_max_freq = freq_max;
        info.uhf_band = true;
        info.vhf_band = true;
    } else if freq_min < 200 {
        info.vhf_min_freq = freq_min;
        info.vhf_max_freq = freq_max;
        info.vhf_band = true;
    } else {
        info.uhf_min_freq = freq_min;
        info.uhf_max_freq = freq_max;
        info.uhf_band = true;
    }

    Ok(info)
}
