//! Parsing and tracking of ffmpeg `-progress` output.
//!
//! ffmpeg writes blocks of `key=value` lines to the progress sink, each block
//! closed by `progress=continue` or, for the last one, `progress=end`. Only
//! the converted media time and the end marker matter here; every other key
//! is skipped, and values that fail to parse are dropped without affecting
//! the tracked state.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, trace};

use super::display::ProgressDisplay;
use super::types::{MediaDuration, ProgressFrame, ProgressSample};

/// `HH:MM:SS[.frac]` as written in `out_time=`.
static CLOCK_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").ok());

/// A recognised progress update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    /// Media time converted so far, in seconds.
    OutTime(f64),
    /// The encoder finished writing output.
    End,
}

/// Parses one line of progress output.
///
/// Returns `None` for unknown keys, non-terminal `progress=` markers and
/// malformed values.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let (key, value) = line.trim().split_once('=')?;
    let value = value.trim();

    match key.trim() {
        // Despite the name, ffmpeg reports microseconds here.
        "out_time_ms" | "out_time_us" => {
            let micros = value.parse::<i64>().ok()?;
            Some(ProgressUpdate::OutTime(micros as f64 / 1_000_000.0))
        }
        "out_time" => parse_clock(value).map(ProgressUpdate::OutTime),
        "progress" if value == "end" => Some(ProgressUpdate::End),
        _ => None,
    }
}

/// Parses `HH:MM:SS.frac` into seconds.
fn parse_clock(value: &str) -> Option<f64> {
    let caps = (*CLOCK_RE).as_ref()?.captures(value)?;
    let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let minutes = caps.get(2)?.as_str().parse::<f64>().ok()?;
    let seconds = caps.get(3)?.as_str().parse::<f64>().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Converted-time state for one run, and the rules for when to render.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    /// Total duration, only kept when finite and positive.
    total_secs: Option<f64>,
    converted_secs: f64,
    last_percent: Option<u8>,
    last_sample: Option<ProgressSample>,
}

impl ProgressTracker {
    pub fn new(duration: MediaDuration) -> Self {
        Self {
            total_secs: duration.filter(|d| d.is_finite() && *d > 0.0),
            converted_secs: 0.0,
            last_percent: None,
            last_sample: None,
        }
    }

    /// Total duration used for percentages, if known.
    pub fn total_secs(&self) -> Option<f64> {
        self.total_secs
    }

    /// Converted time as displayed. Never decreases.
    pub fn converted_secs(&self) -> f64 {
        self.converted_secs
    }

    /// Percentage of the last rendered frame.
    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    /// Most recent sample, rendered or not.
    pub fn last_sample(&self) -> Option<&ProgressSample> {
        self.last_sample.as_ref()
    }

    /// Parses and applies a line. Returns a frame when one should be shown.
    pub fn handle_line(&mut self, line: &str, elapsed: Duration) -> Option<ProgressFrame> {
        let update = parse_progress_line(line)?;
        self.apply(update, elapsed)
    }

    /// Applies an update. Returns a frame when one should be shown.
    ///
    /// With a known total, a frame is produced only when the integer
    /// percentage differs from the last one produced. Without a total every
    /// update yields a frame.
    pub fn apply(&mut self, update: ProgressUpdate, elapsed: Duration) -> Option<ProgressFrame> {
        match update {
            ProgressUpdate::OutTime(secs) if secs.is_finite() => {
                let capped = match self.total_secs {
                    Some(total) => secs.min(total),
                    None => secs,
                };
                self.converted_secs = self.converted_secs.max(capped);
            }
            ProgressUpdate::OutTime(_) => {}
            ProgressUpdate::End => {
                if let Some(total) = self.total_secs {
                    self.converted_secs = total;
                }
            }
        }

        let sample = ProgressSample {
            elapsed,
            converted_secs: self.converted_secs,
        };
        self.last_sample = Some(sample);

        let Some(total_secs) = self.total_secs else {
            return Some(ProgressFrame::Unknown { sample });
        };

        let fraction = (self.converted_secs / total_secs).clamp(0.0, 1.0);
        let percent = (100.0 * self.converted_secs / total_secs)
            .floor()
            .clamp(0.0, 100.0) as u8;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);

        let eta_secs = if fraction > 0.0 {
            elapsed.as_secs_f64() * (1.0 / fraction - 1.0)
        } else {
            0.0
        };

        Some(ProgressFrame::Known {
            sample,
            total_secs,
            fraction,
            percent,
            eta_secs,
        })
    }
}

/// Reads progress lines until end of stream, rendering frames as they come.
///
/// Lines are decoded lossily so that garbled bytes never end the stream
/// early. Returns only on end of stream or a read error. Render failures are
/// logged and otherwise ignored.
pub async fn consume_progress<R>(
    mut reader: R,
    tracker: &mut ProgressTracker,
    display: &mut dyn ProgressDisplay,
    started: Instant,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        trace!(line, "progress");

        if let Some(frame) = tracker.handle_line(line, started.elapsed()) {
            if let Err(e) = display.render(&frame) {
                debug!(error = %e, "Failed to render progress frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::io::BufReader;

    #[derive(Default)]
    struct RecordingDisplay {
        frames: Vec<ProgressFrame>,
        finished: bool,
    }

    impl ProgressDisplay for RecordingDisplay {
        fn render(&mut self, frame: &ProgressFrame) -> io::Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_parse_out_time_ms() {
        assert_eq!(
            parse_progress_line("out_time_ms=1500000"),
            Some(ProgressUpdate::OutTime(1.5))
        );
        assert_eq!(
            parse_progress_line("  out_time_us=2000000 \r"),
            Some(ProgressUpdate::OutTime(2.0))
        );
    }

    #[test]
    fn test_parse_out_time_clock() {
        assert_eq!(
            parse_progress_line("out_time=01:02:03.500000"),
            Some(ProgressUpdate::OutTime(3723.5))
        );
        assert_eq!(
            parse_progress_line("out_time=00:00:07"),
            Some(ProgressUpdate::OutTime(7.0))
        );
    }

    #[test]
    fn test_parse_end_marker() {
        assert_eq!(parse_progress_line("progress=end"), Some(ProgressUpdate::End));
        assert_eq!(parse_progress_line("progress=continue"), None);
    }

    #[test]
    fn test_parse_ignores_other_keys_and_garbage() {
        assert_eq!(parse_progress_line("frame=120"), None);
        assert_eq!(parse_progress_line("speed=1.02x"), None);
        assert_eq!(parse_progress_line("out_time_ms=N/A"), None);
        assert_eq!(parse_progress_line("out_time=N/A"), None);
        assert_eq!(parse_progress_line("out_time=12:xx:00"), None);
        assert_eq!(parse_progress_line("out_time_ms"), None);
        assert_eq!(parse_progress_line(""), None);
        assert_eq!(parse_progress_line("\u{fffd}\u{fffd}=\u{fffd}"), None);
    }

    #[test]
    fn test_end_marker_forces_full_duration() {
        let mut tracker = ProgressTracker::new(Some(2.0));
        tracker.handle_line("out_time_ms=1000000", secs(1));
        tracker.handle_line("out_time_ms=1900000", secs(2));
        let frame = tracker.handle_line("progress=end", secs(2)).unwrap();

        assert_eq!(tracker.converted_secs(), 2.0);
        assert_eq!(frame.percent(), Some(100));
        assert_eq!(frame.sample().converted_secs, 2.0);
    }

    #[test]
    fn test_end_marker_after_exact_sample_keeps_hundred() {
        let mut tracker = ProgressTracker::new(Some(2.0));
        tracker.handle_line("out_time_ms=1000000", secs(1));
        let last = tracker.handle_line("out_time_ms=2000000", secs(2)).unwrap();
        assert_eq!(last.percent(), Some(100));

        // Already at 100%, so the end marker is de-duplicated.
        assert!(tracker.handle_line("progress=end", secs(2)).is_none());
        assert_eq!(tracker.converted_secs(), 2.0);
        assert_eq!(tracker.last_percent(), Some(100));
    }

    #[test]
    fn test_malformed_line_has_no_effect() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.handle_line("out_time_ms=1000000", secs(1));
        assert!(tracker.handle_line("out_time_ms=12ab", secs(1)).is_none());
        assert_eq!(tracker.converted_secs(), 1.0);
        tracker.handle_line("out_time_ms=3000000", secs(2));
        assert_eq!(tracker.converted_secs(), 3.0);
    }

    #[test]
    fn test_unknown_duration_never_has_percent() {
        let mut tracker = ProgressTracker::new(None);
        let frames: Vec<_> = ["out_time=00:00:01.0", "out_time=00:00:01.0", "out_time=00:00:02.5"]
            .iter()
            .filter_map(|line| tracker.handle_line(line, secs(1)))
            .collect();

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.percent().is_none()));
        assert!(tracker.last_percent().is_none());
        assert_eq!(tracker.converted_secs(), 2.5);
    }

    #[test]
    fn test_non_positive_duration_is_unknown() {
        assert_eq!(ProgressTracker::new(Some(0.0)).total_secs(), None);
        assert_eq!(ProgressTracker::new(Some(-5.0)).total_secs(), None);
        assert_eq!(ProgressTracker::new(Some(f64::NAN)).total_secs(), None);
        assert_eq!(ProgressTracker::new(Some(4.0)).total_secs(), Some(4.0));
    }

    #[test]
    fn test_end_marker_without_duration_keeps_time() {
        let mut tracker = ProgressTracker::new(None);
        tracker.handle_line("out_time_ms=4000000", secs(1));
        let frame = tracker.handle_line("progress=end", secs(2)).unwrap();
        assert_eq!(frame.sample().converted_secs, 4.0);
    }

    #[test]
    fn test_dedup_by_percent() {
        let mut tracker = ProgressTracker::new(Some(100.0));
        let mut rendered = Vec::new();
        for t in [0.1, 0.5, 0.9, 1.0, 1.4, 2.0, 2.0, 3.7] {
            let line = format!("out_time_ms={}", (t * 1_000_000.0) as i64);
            if let Some(frame) = tracker.handle_line(&line, secs(1)) {
                rendered.push(frame.percent().unwrap());
            }
        }
        assert_eq!(rendered, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_backwards_sample_does_not_lower_display() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.handle_line("out_time_ms=5000000", secs(1));
        assert!(tracker.handle_line("out_time_ms=2000000", secs(2)).is_none());
        assert_eq!(tracker.converted_secs(), 5.0);
        assert_eq!(tracker.last_sample().unwrap().converted_secs, 5.0);

        // Negative start-up values are ignored too.
        let mut tracker = ProgressTracker::new(None);
        let frame = tracker.handle_line("out_time_ms=-9223372036854775807", secs(0)).unwrap();
        assert_eq!(frame.sample().converted_secs, 0.0);
    }

    #[test]
    fn test_overshoot_is_capped_to_duration() {
        let mut tracker = ProgressTracker::new(Some(2.0));
        let frame = tracker.handle_line("out_time_ms=2100000", secs(1)).unwrap();
        assert_eq!(frame.percent(), Some(100));
        assert_eq!(tracker.converted_secs(), 2.0);
    }

    #[test]
    fn test_eta_computation() {
        let mut tracker = ProgressTracker::new(Some(100.0));
        let frame = tracker.handle_line("out_time_ms=25000000", secs(10)).unwrap();
        match frame {
            ProgressFrame::Known {
                percent,
                eta_secs,
                fraction,
                total_secs,
                ..
            } => {
                assert_eq!(percent, 25);
                assert!((fraction - 0.25).abs() < 1e-9);
                assert!((eta_secs - 30.0).abs() < 1e-9);
                assert_eq!(total_secs, 100.0);
            }
            other => panic!("expected known frame, got {:?}", other),
        }

        let mut tracker = ProgressTracker::new(Some(100.0));
        match tracker.handle_line("out_time_ms=0", secs(10)).unwrap() {
            ProgressFrame::Known { eta_secs, percent, .. } => {
                assert_eq!(percent, 0);
                assert_eq!(eta_secs, 0.0);
            }
            other => panic!("expected known frame, got {:?}", other),
        }
    }

    #[test]
    fn test_percent_bounds() {
        let total = 7.3;
        for step in 0..=80 {
            let t = step as f64 / 10.0;
            let mut tracker = ProgressTracker::new(Some(total));
            let frame = tracker.apply(ProgressUpdate::OutTime(t), secs(1)).unwrap();
            assert!(frame.percent().unwrap() <= 100);
        }
    }

    #[test]
    fn test_percent_of_decimal_times() {
        // Scaling before dividing keeps these on the exact whole percentage.
        for (t, total, expected) in [
            (0.7, 5.0, 14),
            (1.4, 5.0, 28),
            (2.8, 5.0, 56),
            (3.3, 5.0, 66),
            (0.7, 10.0, 7),
            (5.6, 10.0, 56),
            (2.5, 10.0, 25),
            (9.99, 10.0, 99),
        ] {
            let mut tracker = ProgressTracker::new(Some(total));
            let frame = tracker.apply(ProgressUpdate::OutTime(t), secs(1)).unwrap();
            assert_eq!(frame.percent(), Some(expected), "t={} D={}", t, total);
        }
    }

    #[tokio::test]
    async fn test_consume_progress_stream() {
        let stream = tokio_test::io::Builder::new()
            .read(b"frame=10\nout_time_ms=1000000\n")
            .read(b"out_time=00:00:0")
            .read(b"1.500000\nprogress=continue\n\n")
            .read(b"out_time_ms=\xff\xfe\n")
            .read(b"out_time_ms=2000000\nprogress=end\n")
            .build();

        let mut tracker = ProgressTracker::new(Some(2.0));
        let mut display = RecordingDisplay::default();
        consume_progress(
            BufReader::new(stream),
            &mut tracker,
            &mut display,
            Instant::now(),
        )
        .await
        .unwrap();

        let percents: Vec<_> = display.frames.iter().filter_map(|f| f.percent()).collect();
        assert_eq!(percents, vec![50, 75, 100]);
        assert_eq!(tracker.converted_secs(), 2.0);
        assert!(!display.finished);
    }

    #[tokio::test]
    async fn test_consume_progress_into_channel_ends_at_hundred() {
        let stream = tokio_test::io::Builder::new()
            .read(b"out_time_ms=1000000\nout_time_ms=1500000\n")
            .read(b"out_time_ms=2000000\nprogress=end\n")
            .build();

        let (mut display, rx) = crate::converter::ChannelDisplay::channel();
        let mut tracker = ProgressTracker::new(Some(2.0));
        consume_progress(
            BufReader::new(stream),
            &mut tracker,
            &mut display,
            Instant::now(),
        )
        .await
        .unwrap();
        display.finish().unwrap();

        let last = rx.borrow().clone().and_then(|f| f.percent());
        assert_eq!(last, Some(100));
    }

    #[tokio::test]
    async fn test_consume_progress_read_error() {
        let stream = tokio_test::io::Builder::new()
            .read(b"out_time_ms=1000000\n")
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            .build();

        let mut tracker = ProgressTracker::new(None);
        let mut display = RecordingDisplay::default();
        let err = consume_progress(
            BufReader::new(stream),
            &mut tracker,
            &mut display,
            Instant::now(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(display.frames.len(), 1);
    }
}
