//! Progress displays.

use std::io::{self, Write};
use tokio::sync::watch;

use super::time::format_time;
use super::types::ProgressFrame;

/// Receives progress frames while a transcode runs.
pub trait ProgressDisplay: Send {
    /// Shows a frame.
    fn render(&mut self, frame: &ProgressFrame) -> io::Result<()>;

    /// Called once after the last frame, whatever the outcome.
    fn finish(&mut self) -> io::Result<()>;
}

/// Renders a `#`/`-` bar of `width` cells for a fraction in `[0, 1]`.
pub fn render_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64) as usize).min(width);
    let mut bar = String::with_capacity(width);
    bar.extend(std::iter::repeat_n('#', filled));
    bar.extend(std::iter::repeat_n('-', width - filled));
    bar
}

/// Formats a frame as a single status line, without carriage return.
pub fn format_frame(frame: &ProgressFrame, bar_width: usize) -> String {
    match frame {
        ProgressFrame::Known {
            sample,
            total_secs,
            fraction,
            percent,
            eta_secs,
        } => format!(
            "[SWF] |{}| {:3}%  {} / {}  ETA {}",
            render_bar(*fraction, bar_width),
            percent,
            format_time(sample.converted_secs),
            format_time(*total_secs),
            format_time(*eta_secs),
        ),
        ProgressFrame::Unknown { sample } => format!(
            "[SWF] Converting... {} elapsed",
            format_time(sample.converted_secs)
        ),
    }
}

/// Overwrites a single terminal line with each frame.
pub struct TerminalDisplay<W: Write + Send> {
    out: W,
    bar_width: usize,
}

impl TerminalDisplay<io::Stdout> {
    /// Display writing to standard output.
    pub fn stdout(bar_width: usize) -> Self {
        Self::new(io::stdout(), bar_width)
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(out: W, bar_width: usize) -> Self {
        Self { out, bar_width }
    }

    /// Consumes the display, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressDisplay for TerminalDisplay<W> {
    fn render(&mut self, frame: &ProgressFrame) -> io::Result<()> {
        write!(self.out, "\r{}", format_frame(frame, self.bar_width))?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Publishes the newest frame on a watch channel.
///
/// Rendering never blocks the progress loop. A receiver that lags sees
/// intermediate frames coalesced, but always observes the latest one,
/// including the final frame of a run.
pub struct ChannelDisplay {
    tx: watch::Sender<Option<ProgressFrame>>,
}

impl ChannelDisplay {
    pub fn new(tx: watch::Sender<Option<ProgressFrame>>) -> Self {
        Self { tx }
    }

    /// Display paired with a receiver that starts at `None`.
    pub fn channel() -> (Self, watch::Receiver<Option<ProgressFrame>>) {
        let (tx, rx) = watch::channel(None);
        (Self::new(tx), rx)
    }
}

impl ProgressDisplay for ChannelDisplay {
    fn render(&mut self, frame: &ProgressFrame) -> io::Result<()> {
        // Stores the frame even when no receiver is subscribed.
        self.tx.send_replace(Some(frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}
