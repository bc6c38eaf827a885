#![no_main]
use libfuzzer_sys::fuzz_target;
use mixworks_core::color::{ColorHarmony, CssColorResolver, parse_hsl, resolve_color};
use mixworks_core::id::ExternalId;

fuzz_target!(|data: &[u8]| {
    // Color strings and composite ids come straight from the user.
    // Must not panic -- `None` and fallbacks are fine.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(rgb) = resolve_color(text, &CssColorResolver) {
        let _ = ColorHarmony::of(rgb);
    }
    let hsl = parse_hsl(text);
    assert!(hsl.h < 360 && hsl.s <= 100 && hsl.l <= 100);
    let _ = text.parse::<ExternalId>();
});
