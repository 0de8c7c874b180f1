pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

pub fn init_logger() {
    // a second client on the same page finds the logger already installed
    if console_log::init_with_level(log::Level::Debug).is_err() {
        log::trace!("console logger already installed");
    }
}
