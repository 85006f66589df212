#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed scene descriptions must produce errors or warnings, never panics
    if let Ok(xml) = std::str::from_utf8(data)
        && let Ok((document, _)) = libmvr::parse_scene_xml(xml)
    {
        let _ = libmvr::build_scene(&document, &libmvr::ImportConfig::new());
        let _ = libmvr::write_scene_xml(&document);
    }
});
