#![no_main]

use gatecast_telegram::CallbackAction;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Some(action) = CallbackAction::parse(&raw) {
        let encoded = action.encode();
        assert_eq!(CallbackAction::parse(&encoded), Some(action));
        assert!(encoded.len() <= 64, "callback data exceeds Telegram's 64-byte limit");
    }
});
