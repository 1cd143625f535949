//! Window decoder
//!
//! Pure mapping from a [`RegisterWindow`] to a [`MeasurementMap`] driven by
//! the static block layouts of the register map.

use std::borrow::Cow;

use cm1_comlink::RegisterWindow;
use tracing::trace;

use crate::error::{DecodeError, Result};
use crate::measurement::MeasurementMap;
use crate::register_map::{BlockLayout, PolledWindow};

/// Decode every block placed in `window`
///
/// Fails with [`DecodeError::MalformedWindow`] if any layout reaches past the
/// end of the window.
pub fn decode_window(window: &RegisterWindow, layouts: &[BlockLayout]) -> Result<MeasurementMap> {
    let mut measurements = MeasurementMap::new();
    for layout in layouts {
        let words = gather(window, layout)?;
        let decoded = layout.block.decode(&words)?;
        trace!(
            block = layout.block.name(),
            start = window.start(),
            values = decoded.len(),
            "Decoded block"
        );
        measurements.merge(decoded);
    }
    Ok(measurements)
}

/// Decode a polled window using its own layout table
pub fn decode_polled(polled: &PolledWindow, window: &RegisterWindow) -> Result<MeasurementMap> {
    decode_window(window, polled.blocks)
}

fn gather<'a>(window: &'a RegisterWindow, layout: &BlockLayout) -> Result<Cow<'a, [u16]>> {
    let malformed =
        || DecodeError::malformed(layout.block.name(), layout.required_len(), window.len());

    match layout.slices {
        [single] => window
            .slice(single.offset, single.len)
            .map(Cow::Borrowed)
            .ok_or_else(malformed),
        slices => {
            let mut words = Vec::with_capacity(layout.word_count());
            for slice in slices {
                let part = window.slice(slice.offset, slice.len).ok_or_else(malformed)?;
                words.extend_from_slice(part);
            }
            Ok(Cow::Owned(words))
        },
    }
}
