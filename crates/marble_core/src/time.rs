//! Virtual time units.
//!
//! The harness measures time in frames. A frame is the smallest unit of
//! virtual time and carries no relation to the wall clock: the scheduler
//! jumps straight from one frame with pending work to the next.
//!
//! Marble diagrams advance one frame per marker. Longer gaps can be written
//! with time progression shorthand (`10ms`, `1s`, `2m`), which is converted
//! to frames using [`FRAME_DURATION_MS`].

use crate::error::ParseErrorKind;

/// A point in virtual time.
pub type Frame = u64;

/// Virtual milliseconds represented by one frame.
///
/// Time progression shorthand must convert to a whole number of frames;
/// `1.5ms` is rejected instead of being rounded.
pub const FRAME_DURATION_MS: u64 = 1;

/// Units accepted by time progression shorthand, longest suffix first.
const UNITS: [(&str, u64); 3] = [("ms", 1), ("s", 1_000), ("m", 60_000)];

/// Convert a duration in virtual milliseconds to frames.
///
/// Returns `None` if the duration is not a whole number of frames.
#[must_use]
pub const fn ms_to_frames(ms: u64) -> Option<Frame> {
    if ms % FRAME_DURATION_MS == 0 {
        Some(ms / FRAME_DURATION_MS)
    } else {
        None
    }
}

/// Convert frames to virtual milliseconds, saturating on overflow.
#[must_use]
pub const fn frames_to_ms(frames: Frame) -> u64 {
    frames.saturating_mul(FRAME_DURATION_MS)
}

/// A recognized time progression token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progression {
    /// Frames the token advances.
    pub frames: Frame,
    /// Characters consumed from the diagram.
    pub len: usize,
}

/// Try to read a time progression token starting at `start`.
///
/// A token is only recognized at the start of the diagram or after
/// whitespace, and must be followed by whitespace or the end of the diagram.
/// Returns `None` when the characters are not a token (they are then plain
/// labels), and `Some(Err(_))` for a token whose duration is unusable.
pub(crate) fn progression_at(
    chars: &[char],
    start: usize,
) -> Option<Result<Progression, ParseErrorKind>> {
    if !chars.get(start)?.is_ascii_digit() {
        return None;
    }
    if start > 0 && !chars[start - 1].is_whitespace() {
        return None;
    }

    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    let int_part: String = chars[start..end].iter().collect();

    let mut frac_part = String::new();
    if chars.get(end) == Some(&'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < chars.len() && chars[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end == frac_start {
            return None;
        }
        frac_part = chars[frac_start..frac_end].iter().collect();
        end = frac_end;
    }

    let (unit, factor) = UNITS.iter().copied().find(|(unit, _)| {
        let unit_len = unit.chars().count();
        end + unit_len <= chars.len() && chars[end..end + unit_len].iter().copied().eq(unit.chars())
    })?;
    let token_end = end + unit.chars().count();

    if token_end < chars.len() && !chars[token_end].is_whitespace() {
        return None;
    }

    let token: String = chars[start..token_end].iter().collect();
    Some(duration_frames(&int_part, &frac_part, factor, &token).map(|frames| Progression {
        frames,
        len: token_end - start,
    }))
}

/// Convert `int_part.frac_part` units of `factor` milliseconds to frames.
fn duration_frames(
    int_part: &str,
    frac_part: &str,
    factor: u64,
    token: &str,
) -> Result<Frame, ParseErrorKind> {
    let overflow = || ParseErrorKind::DurationOverflow(token.to_string());
    let fractional = || ParseErrorKind::FractionalDuration(token.to_string());

    let whole: u64 = int_part.parse().map_err(|_| overflow())?;
    let mut ms = whole.checked_mul(factor).ok_or_else(overflow)?;

    if !frac_part.is_empty() {
        let digits = u32::try_from(frac_part.len()).map_err(|_| overflow())?;
        let scale = 10u64.checked_pow(digits).ok_or_else(overflow)?;
        let frac: u64 = frac_part.parse().map_err(|_| overflow())?;
        let scaled = frac.checked_mul(factor).ok_or_else(overflow)?;
        if scaled % scale != 0 {
            return Err(fractional());
        }
        ms = ms.checked_add(scaled / scale).ok_or_else(overflow)?;
    }

    ms_to_frames(ms).ok_or_else(fractional)
}
