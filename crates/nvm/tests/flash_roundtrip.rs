//! Erase/write/read round trips against the NOR-semantics RAM flash.

#![allow(clippy::unwrap_used)]

use nvm::mocks::RamFlash;
use nvm::{NvmArea, NvmDevice, NvmError};

const BASE: u32 = 0x0804_0000;
const ERASE: usize = 16 * 1024;
const SIZE: usize = 256 * 1024;

fn flash_fixture() -> RamFlash<'static> {
    // Fresh parts ship erased.
    let mem: &'static mut [u8] = Box::leak(vec![0xFFu8; SIZE].into_boxed_slice());
    RamFlash::new(mem, BASE, ERASE, 6)
}

#[test]
fn erase_write_read_round_trip() {
    let flash = flash_fixture();

    flash.erase(BASE, SIZE).unwrap();

    // Byte-by-byte writes of the full pattern.
    for i in 0..SIZE {
        flash.write(BASE + i as u32, &[(i % 256) as u8]).unwrap();
    }

    let mut chunk = [0u8; 4096];
    for off in (0..SIZE).step_by(chunk.len()) {
        flash.read(BASE + off as u32, &mut chunk).unwrap();
        for (i, byte) in chunk.iter().enumerate() {
            assert_eq!(*byte, ((off + i) % 256) as u8);
        }
    }

    // Erasing the second 128 KiB half leaves the first half intact and
    // returns the second to the erased state.
    flash.erase(BASE + 0x2_0000, 0x2_0000).unwrap();

    let mut byte = [0u8; 1];
    flash.read(BASE + 0x1_FFFF, &mut byte).unwrap();
    assert_eq!(byte[0], (0x1_FFFF % 256) as u8);

    for off in (0x2_0000..SIZE).step_by(4096) {
        flash.read(BASE + off as u32, &mut chunk).unwrap();
        assert!(chunk.iter().all(|&b| b == 0xFF), "offset {off:#x} not erased");
    }
}

#[test]
fn erase_enforces_sector_granularity() {
    let flash = flash_fixture();

    assert_eq!(flash.erase(BASE + 1, ERASE), Err(NvmError::Inval));
    assert_eq!(flash.erase(BASE, ERASE - 1), Err(NvmError::Inval));
    assert_eq!(flash.erase(BASE, SIZE + ERASE), Err(NvmError::Inval));
    flash.erase(BASE, ERASE).unwrap();
}

#[test]
fn writes_only_clear_bits_without_erase() {
    let flash = flash_fixture();
    flash.erase(BASE, SIZE).unwrap();

    flash.write(BASE, &[0xF0]).unwrap();
    flash.write(BASE, &[0x0F]).unwrap();

    let mut byte = [0u8; 1];
    flash.read(BASE, &mut byte).unwrap();
    assert_eq!(byte[0], 0x00, "NOR write must AND into the cell");
}

#[test]
fn area_on_flash_translates_and_syncs() {
    let flash = flash_fixture();
    flash.erase(BASE, SIZE).unwrap();

    // Window over the third 16 KiB sector. Area addresses are relative;
    // the start address carries the device's absolute mapping.
    let area = NvmArea::new("codeplug", &flash, BASE + 0x8000, ERASE, &[]);
    area.write(0x100, &[1, 2, 3, 4]).unwrap();

    let mut back = [0u8; 4];
    flash.read(BASE + 0x8100, &mut back).unwrap();
    assert_eq!(back, [1, 2, 3, 4]);

    area.erase(0, ERASE).unwrap();
    area.read(0x100, &mut back).unwrap();
    assert_eq!(back, [0xFF; 4]);
}
