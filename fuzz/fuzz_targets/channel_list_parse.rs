#![no_main]

use gatecast_engine::{parse_channel_list, EngineConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let channels = parse_channel_list(&raw);
    for channel in &channels {
        let value = channel.as_str();
        assert!(!value.is_empty());
        assert!(!value.contains(','));
        assert_eq!(value, value.trim());
    }
    match EngineConfig::new(channels.clone(), "https://t.me/fuzz") {
        Ok(config) => {
            assert!(!config.channels.is_empty());
            assert!(config.channels.len() <= channels.len());
        }
        Err(_) => assert!(channels.is_empty()),
    }
});
