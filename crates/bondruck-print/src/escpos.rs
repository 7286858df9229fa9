// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS control sequences for receipt output.
//
// Only the slice of the command set this daemon needs: initialise,
// plain text, and feed-and-cut. Code page selection is left to the
// printer's configured default.

/// Initialise the printer (ESC @), clearing any stale mode state left
/// by a previous job.
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// Lines fed before the cut so the printed text clears the blade.
pub const CUT_FEED_LINES: u8 = 4;

/// Render a payload as printable text: initialise, payload bytes, and a
/// trailing line feed so the last line leaves the print head.
pub fn render_text(payload: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 3);
    buf.extend_from_slice(&INIT);
    buf.extend_from_slice(payload.as_bytes());
    if !payload.ends_with('\n') {
        buf.push(b'\n');
    }
    buf
}

/// Feed `lines` and perform a full cut (GS V 66 n). Letting the printer
/// manage the feed keeps the cutter-to-head distance correct.
pub fn cut_feed(lines: u8) -> [u8; 4] {
    [0x1D, 0x56, 0x42, lines]
}
