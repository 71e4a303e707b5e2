//! Console output, to the UART.

pub mod print;
mod uart;

/// Sends one character to the UART.
pub fn put_char(c: char) {
    if c == '\n' {
        uart::putc_sync('\r');
    }
    uart::putc_sync(c);
}

pub fn init() {
    uart::init();
}
