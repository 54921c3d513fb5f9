//! Default sink volume control through `pactl`

use std::io;
use std::process::Command;

use k65_keyboard::VolumeControl;
use tracing::debug;

const SINK: &str = "@DEFAULT_SINK@";

#[derive(Debug, Default)]
pub struct PactlVolume;

impl PactlVolume {
    fn pactl(&self, args: &[&str]) -> io::Result<()> {
        debug!("pactl {}", args.join(" "));
        let status = Command::new("pactl").args(args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("pactl {} exited with {}", args[0], status),
            ))
        }
    }
}

/// `+5%` / `-5%`
fn volume_delta(step: u8, increase: bool) -> String {
    format!("{}{}%", if increase { '+' } else { '-' }, step)
}

impl VolumeControl for PactlVolume {
    fn set_mute(&mut self, muted: bool) -> io::Result<()> {
        self.pactl(&["set-sink-mute", SINK, if muted { "1" } else { "0" }])
    }

    fn adjust_volume(&mut self, step: u8, increase: bool) -> io::Result<()> {
        self.pactl(&["set-sink-volume", SINK, &volume_delta(step, increase)])
    }
}
