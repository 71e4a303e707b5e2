//! Polling driver for the 16550a UART.
//!
//! The boot flow runs with interrupts disabled, so output is synchronous.

use core::{hint, ptr, sync::atomic::Ordering};

use super::print::PANICKED;
use crate::layout::UART0;

unsafe fn reg(offset: usize) -> *mut u8 {
    unsafe { ptr::with_exposed_provenance_mut::<u8>(UART0).byte_add(offset) }
}

// see http://byterunner.com/16550.html

/// transmit holding register (for output bytes)
const THR: usize = 0;
/// interrupt enable register
const IER: usize = 1;
/// FIFO control register
const FCR: usize = 2;
const FCR_FIFO_ENABLE: u8 = 1 << 0;
/// clear the content of the two FIFOs
const FCR_FIFO_CLEAR: u8 = 3 << 1;
/// line control register
const LCR: usize = 3;
const LCR_EIGHT_BITS: u8 = 3;
/// special mode to set baud rate
const LCR_BAUD_LATCH: u8 = 1 << 7;
/// line status register
const LSR: usize = 5;
/// THR can accept another character to send
const LSR_TX_IDLE: u8 = 1 << 5;

unsafe fn read_reg(offset: usize) -> u8 {
    unsafe { reg(offset).read_volatile() }
}

unsafe fn write_reg(offset: usize, data: u8) {
    unsafe { reg(offset).write_volatile(data) }
}

pub fn init() {
    unsafe {
        // disable interrupts
        write_reg(IER, 0x00);

        // special mode to set baud rate.
        write_reg(LCR, LCR_BAUD_LATCH);

        // LSB for baud rate of 38.4K.
        write_reg(0, 0x03);

        // MSB for baud rate of 38.4K.
        write_reg(1, 0x00);

        // leave set-baud mode,
        // and set word length to 8 bits, no parity.
        write_reg(LCR, LCR_EIGHT_BITS);

        // reset and enable FIFOs.
        write_reg(FCR, FCR_FIFO_ENABLE | FCR_FIFO_CLEAR);
    }
}

/// Sends one character, spinning until the UART accepts it.
pub fn putc_sync(c: char) {
    if PANICKED.load(Ordering::Relaxed) {
        loop {
            hint::spin_loop();
        }
    }

    let mut bytes = [0; 4];
    for b in c.encode_utf8(&mut bytes).as_bytes() {
        // wait for Transmit Holding Empty to be set in LSR.
        while (unsafe { read_reg(LSR) } & LSR_TX_IDLE) == 0 {
            hint::spin_loop();
        }
        unsafe { write_reg(THR, *b) };
    }
}
