use log::{LevelFilter, Log, Metadata, Record};

use crate::println;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!(
            "[{:<5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Routes `log` records to the console.
///
/// Must be called once, by the boot hart, after the console is up.
pub fn init(level: LevelFilter) {
    // only fails if a logger is already installed
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
