#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data)
        && let Ok(fixture_type) = libmvr::gdtf::parse_description(xml)
    {
        for (mode, _) in fixture_type.mode_channel_counts() {
            let _ = libmvr::gdtf::collect_channels(&fixture_type, &mode);
        }
    }
});
