#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = nakatani_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = nakatani_core::MeasurementPointList::try_from(&cfg.research);
        }
    }
});
