//! Vendor calibration decoding.
//!
//! Calibration lives in two 256-byte security registers of the external
//! flash, in the layout the factory CPS writes. Frequencies are packed
//! BCD, divided by ten on flash; everything else is plain unsigned
//! bytes. Single-band radios carry nine calibration points; dual-band
//! radios add a VHF block with five points at shifted offsets inside
//! the same two registers.

use memory::codec::{bcd_to_bin, get_u32_le, get_u8};
use nvm::{NvmArea, NvmError};

/// Calibration points per band on a single-band radio.
const UHF_CAL_POINTS: usize = 9;
/// Calibration points of the dual-band radios' VHF block.
const VHF_CAL_POINTS: usize = 5;

/// Runtime calibration data of one band.
///
/// Dual-band radios fill only the first five entries of each table for
/// the VHF side; the rest stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalData {
    /// Mid-band frequency adjustment from the factory.
    pub freq_adjust_mid: u8,
    /// Receive frequency of each calibration point, in Hz.
    pub rx_freq: [u32; UHF_CAL_POINTS],
    /// Transmit frequency of each calibration point, in Hz.
    pub tx_freq: [u32; UHF_CAL_POINTS],
    /// PA setting for high power at each point.
    pub tx_high_power: [u8; UHF_CAL_POINTS],
    /// PA setting for low power at each point.
    pub tx_low_power: [u8; UHF_CAL_POINTS],
    /// Receiver front-end sensitivity setting at each point.
    pub rx_sensitivity: [u8; UHF_CAL_POINTS],
    /// Digital modulation I-branch range.
    pub send_i_range: [u8; UHF_CAL_POINTS],
    /// Digital modulation Q-branch range.
    pub send_q_range: [u8; UHF_CAL_POINTS],
    /// Analog modulation I-branch range.
    pub analog_send_i_range: [u8; UHF_CAL_POINTS],
    /// Analog modulation Q-branch range.
    pub analog_send_q_range: [u8; UHF_CAL_POINTS],
}

/// Calibration of a dual-band radio: full UHF block plus the
/// five-point VHF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DualBandCalData {
    /// UHF calibration, nine points.
    pub uhf: CalData,
    /// VHF calibration, five points.
    pub vhf: CalData,
}

/// Decode the single-band (or UHF) calibration block.
///
/// `sec1` and `sec2` are the two security-register areas; offsets are
/// relative to each register.
///
/// # Errors
///
/// Propagates NVM read failures.
pub fn read_calib_data(sec1: &NvmArea, sec2: &NvmArea) -> Result<CalData, NvmError> {
    let mut cal = CalData::default();

    let mut byte = [0u8; 1];
    sec1.read(0x09, &mut byte)?;
    cal.freq_adjust_mid = get_u8(&byte);

    sec1.read(0x10, &mut cal.tx_high_power)?;
    sec1.read(0x20, &mut cal.tx_low_power)?;
    sec1.read(0x30, &mut cal.rx_sensitivity)?;

    sec2.read(0x30, &mut cal.send_i_range)?;
    sec2.read(0x40, &mut cal.send_q_range)?;
    sec2.read(0x70, &mut cal.analog_send_i_range)?;
    sec2.read(0x80, &mut cal.analog_send_q_range)?;

    // Nine {rx, tx} pairs of BCD-packed 32-bit words. The stored value
    // is the frequency divided by ten, so scale back up to Hz.
    let mut freqs = [0u8; UHF_CAL_POINTS * 8];
    sec2.read(0xB0, &mut freqs)?;
    for i in 0..UHF_CAL_POINTS {
        cal.rx_freq[i] = bcd_to_bin(get_u32_le(&freqs[i * 8..])) * 10;
        cal.tx_freq[i] = bcd_to_bin(get_u32_le(&freqs[i * 8 + 4..])) * 10;
    }

    Ok(cal)
}

/// Decode the dual-band calibration: the UHF block plus the shifted
/// five-point VHF block.
///
/// # Errors
///
/// Propagates NVM read failures.
pub fn read_dual_band_calib(
    sec1: &NvmArea,
    sec2: &NvmArea,
) -> Result<DualBandCalData, NvmError> {
    let mut cal = DualBandCalData {
        uhf: read_calib_data(sec1, sec2)?,
        vhf: CalData::default(),
    };
    let vhf = &mut cal.vhf;

    let mut byte = [0u8; 1];
    sec1.read(0x0C, &mut byte)?;
    vhf.freq_adjust_mid = get_u8(&byte);

    sec1.read(0x19, &mut vhf.tx_high_power[..VHF_CAL_POINTS])?;
    sec1.read(0x29, &mut vhf.tx_low_power[..VHF_CAL_POINTS])?;
    sec1.read(0x39, &mut vhf.rx_sensitivity[..VHF_CAL_POINTS])?;

    sec2.read(0x39, &mut vhf.send_i_range[..VHF_CAL_POINTS])?;
    sec2.read(0x49, &mut vhf.send_q_range[..VHF_CAL_POINTS])?;
    sec2.read(0x79, &mut vhf.analog_send_i_range[..VHF_CAL_POINTS])?;
    sec2.read(0x89, &mut vhf.analog_send_q_range[..VHF_CAL_POINTS])?;

    // The VHF frequency table sits at the start of the second register
    // and is stored in final units already.
    let mut freqs = [0u8; VHF_CAL_POINTS * 8];
    sec2.read(0x00, &mut freqs)?;
    for i in 0..VHF_CAL_POINTS {
        vhf.rx_freq[i] = bcd_to_bin(get_u32_le(&freqs[i * 8..]));
        vhf.tx_freq[i] = bcd_to_bin(get_u32_le(&freqs[i * 8 + 4..]));
    }

    Ok(cal)
}
