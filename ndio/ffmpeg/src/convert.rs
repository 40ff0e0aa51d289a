/*!
    Timestamp and frame index conversions.
*/

use ffmpeg_next::Rational;

const MICROS: Rational = Rational(1, 1_000_000);

/**
    Rescale `value` from one time base to another, rounding to nearest.

    Returns 0 when either time base is degenerate.
*/
pub(crate) fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    if from.0 == to.0 && from.1 == to.1 {
        return value;
    }

    // value * from.num / from.den * to.den / to.num
    let num = value as i128 * from.numerator() as i128 * to.denominator() as i128;
    let den = from.denominator() as i128 * to.numerator() as i128;
    if den == 0 {
        return 0;
    }

    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/**
    Duration of one frame at `rate` frames per second, as a time base.
*/
fn frame_duration(rate: Rational) -> Rational {
    Rational(rate.1, rate.0)
}

/**
    Mapping between presentation timestamps and frame indices for one stream.
*/
#[derive(Clone, Copy, Debug)]
pub(crate) struct FrameTiming {
    /// Stream time base.
    pub time_base: Rational,
    /// Presentation timestamp of the first frame, in the stream time base.
    pub start_time: i64,
    /// Frames per second.
    pub frame_rate: Rational,
}

impl FrameTiming {
    /**
        Frame index of a presentation timestamp.
    */
    pub fn frame_index(&self, pts: i64) -> i64 {
        rescale(
            pts.saturating_sub(self.start_time),
            self.time_base,
            frame_duration(self.frame_rate),
        )
    }

    /**
        Presentation timestamp of a frame index.
    */
    pub fn pts(&self, index: i64) -> i64 {
        rescale(index, frame_duration(self.frame_rate), self.time_base)
            .saturating_add(self.start_time)
    }

    /**
        Presentation timestamp of a frame index in microseconds.
    */
    pub fn micros(&self, index: i64) -> i64 {
        rescale(self.pts(index), self.time_base, MICROS)
    }
}

/**
    Number of frames covered by a duration in microseconds at the given rate.

    Unknown or negative durations yield 0.
*/
pub(crate) fn frames_from_duration(duration_us: i64, frame_rate: Rational) -> u64 {
    if duration_us <= 0 || frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 {
        return 0;
    }
    rescale(duration_us, MICROS, frame_duration(frame_rate)).max(0) as u64
}

/**
    Returns true if `list` (comma separated, as FFmpeg names formats and
    extensions) contains `item`, ignoring ASCII case.
*/
pub(crate) fn name_list_contains(list: &str, item: &str) -> bool {
    !item.is_empty()
        && list
            .split(',')
            .any(|name| name.trim().eq_ignore_ascii_case(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_identity() {
        assert_eq!(rescale(1234, Rational(1, 90_000), Rational(1, 90_000)), 1234);
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        // 1/24 s in milliseconds is 41.67
        assert_eq!(rescale(1, Rational(1, 24), Rational(1, 1000)), 42);
        assert_eq!(rescale(2, Rational(1, 24), Rational(1, 1000)), 83);
        assert_eq!(rescale(-1, Rational(1, 24), Rational(1, 1000)), -42);
    }

    #[test]
    fn rescale_degenerate_time_base() {
        assert_eq!(rescale(10, Rational(1, 24), Rational(0, 1)), 0);
    }

    #[test]
    fn millisecond_timestamps_map_back_to_frames() {
        let timing = FrameTiming {
            time_base: Rational(1, 1000),
            start_time: 0,
            frame_rate: Rational(24, 1),
        };
        for index in 0..100 {
            let pts = timing.pts(index);
            assert_eq!(timing.frame_index(pts), index);
        }
        assert_eq!(timing.pts(1), 42);
        assert_eq!(timing.micros(1), 42_000);
    }

    #[test]
    fn start_time_is_subtracted() {
        let timing = FrameTiming {
            time_base: Rational(1, 90_000),
            start_time: 3_000,
            frame_rate: Rational(30, 1),
        };
        assert_eq!(timing.frame_index(3_000), 0);
        assert_eq!(timing.frame_index(6_000), 1);
        assert_eq!(timing.pts(2), 9_000);
    }

    #[test]
    fn frames_from_duration_rounds() {
        assert_eq!(frames_from_duration(292_000, Rational(24, 1)), 7);
        assert_eq!(frames_from_duration(2_000_000, Rational(30_000, 1001)), 60);
        assert_eq!(frames_from_duration(i64::MIN, Rational(24, 1)), 0);
        assert_eq!(frames_from_duration(1_000_000, Rational(0, 0)), 0);
    }

    #[test]
    fn name_lists() {
        assert!(name_list_contains("matroska,webm", "webm"));
        assert!(name_list_contains("mkv,mk3d,mka,mks,webm", "MKV"));
        assert!(!name_list_contains("mov,mp4,m4a,3gp,3g2,mj2", "mp"));
        assert!(!name_list_contains("avi", ""));
    }
}
