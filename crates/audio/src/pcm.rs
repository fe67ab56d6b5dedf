//! Sample format conversions for DAC and ADC front ends.
//!
//! The DACs in this family take unsigned 12-bit codes while the whole
//! stream API trades in signed 16-bit PCM. Conversion happens in place:
//! once a buffer is handed to a running output stream its owner is
//! contracted not to look at it, so the driver may repurpose the storage
//! freely.

/// Convert signed 16-bit samples to unsigned 12-bit DAC codes, in place.
///
/// Each sample is biased to unsigned and truncated to the DAC width:
/// `(s + 32768) >> 4`, stored in the low 12 bits.
pub fn s16_to_u12(buf: &mut [i16]) {
    for sample in buf {
        let biased = (*sample as i32 + 32768) >> 4;
        *sample = biased as i16;
    }
}

/// Convert unsigned 12-bit codes back to signed 16-bit PCM, in place.
///
/// Inverse of [`s16_to_u12`] up to the four truncated bits.
pub fn u12_to_s16(buf: &mut [i16]) {
    for sample in buf {
        let widened = ((*sample as i32) << 4) - 32768;
        *sample = widened as i16;
    }
}
