//! Line commands read from stdin

use padchop_core::{PadId, NUM_PADS};

/// One parsed command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    /// Seek the global transport (seconds)
    Seek(f64),
    /// Trigger a pad; `reverse` flips the pad's direction for this trigger
    Pad { pad: PadId, reverse: bool },
    /// Fade out the playing pad
    Release,
    /// Global pitch offset in semitones
    Pitch(f64),
    /// Global speed multiplier
    Speed(f64),
    Gain(f32),
    /// Re-chop the file into this many even pads
    Chop(usize),
    Position,
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause          global transport
  seek <seconds>        move the global offset
  pad <1-16> [rev]      trigger a pad (rev plays it backward)
  release               fade out the playing pad
  pitch <semitones>     global pitch offset
  speed <multiplier>    global speed
  gain <linear>         master gain
  chop <count>          re-chop into even pads
  pos | stats | help | quit";

/// Parse one line; pads are numbered from 1
///
/// Empty lines give `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match name.to_ascii_lowercase().as_str() {
        "play" | "p" => Command::Play,
        "pause" | "stop" => Command::Pause,
        "seek" => Command::Seek(number(name, arg)?),
        "pad" => {
            let pad = pad_number(arg)?;
            let reverse = match words.next() {
                None => false,
                Some("rev") | Some("reverse") => true,
                Some(other) => return Err(format!("pad: unknown flag '{}'", other)),
            };
            Command::Pad { pad, reverse }
        }
        "release" | "r" => Command::Release,
        "pitch" => Command::Pitch(number(name, arg)?),
        "speed" => Command::Speed(number(name, arg)?),
        "gain" => Command::Gain(number::<f32>(name, arg)?),
        "chop" => {
            let count: usize = number(name, arg)?;
            if count == 0 || count > NUM_PADS {
                return Err(format!("chop: count must be 1..={}", NUM_PADS));
            }
            Command::Chop(count)
        }
        "pos" | "position" => Command::Position,
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try help)", other)),
    };
    Ok(Some(command))
}

fn number<T: std::str::FromStr>(name: &str, arg: Option<&str>) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("{}: missing value", name))?;
    arg.parse()
        .map_err(|_| format!("{}: '{}' is not a number", name, arg))
}

fn pad_number(arg: Option<&str>) -> Result<PadId, String> {
    let n: usize = number("pad", arg)?;
    if n == 0 || n > NUM_PADS {
        return Err(format!("pad: number must be 1..={}", NUM_PADS));
    }
    Ok(PadId((n - 1) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_commands() {
        assert_eq!(parse("play"), Ok(Some(Command::Play)));
        assert_eq!(parse("  PAUSE "), Ok(Some(Command::Pause)));
        assert_eq!(parse("seek 12.5"), Ok(Some(Command::Seek(12.5))));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("quit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_pad_numbers_are_one_based() {
        assert_eq!(
            parse("pad 1"),
            Ok(Some(Command::Pad {
                pad: PadId(0),
                reverse: false
            }))
        );
        assert_eq!(
            parse("pad 16 rev"),
            Ok(Some(Command::Pad {
                pad: PadId(15),
                reverse: true
            }))
        );
        assert!(parse("pad 0").is_err());
        assert!(parse("pad 17").is_err());
        assert!(parse("pad 3 sideways").is_err());
    }

    #[test]
    fn test_modulation_commands() {
        assert_eq!(parse("pitch -3"), Ok(Some(Command::Pitch(-3.0))));
        assert_eq!(parse("speed 1.5"), Ok(Some(Command::Speed(1.5))));
        assert_eq!(parse("gain 0.5"), Ok(Some(Command::Gain(0.5))));
        assert_eq!(parse("chop 8"), Ok(Some(Command::Chop(8))));
        assert!(parse("chop 0").is_err());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("seek"), Err("seek: missing value".to_string()));
        assert_eq!(
            parse("speed fast"),
            Err("speed: 'fast' is not a number".to_string())
        );
        assert!(parse("dance").is_err());
    }
}
