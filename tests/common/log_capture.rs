use std::{cell::RefCell, sync::Once};

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps every record on the thread that logged it, so parallel tests do not
/// see each other's messages.
struct ThreadCapture;

impl Log for ThreadCapture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: ThreadCapture = ThreadCapture;
static INIT: Once = Once::new();

/// Run `f` and return its result together with the warnings it logged.
pub fn warnings_during<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("another logger is installed");
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
    let result = f();
    let warnings = RECORDS.with(|records| {
        records
            .borrow_mut()
            .drain(..)
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message)
            .collect()
    });
    (result, warnings)
}
