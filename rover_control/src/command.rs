//! Line-oriented command channel.
//!
//! One command per stdin line; responses and telemetry go to stdout.
//! Parsing is forgiving the way a serial console has to be: unknown
//! verbs and malformed arguments are silently dropped, never answered.
//! Parsed commands travel over a channel to the control thread, which is
//! the only writer of navigation state.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::Sender;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Navigate to a point, feet
    Goto { x_ft: f64, y_ft: f64 },
    /// Set the speed multiplier, clamped to [0, 1]
    Speed(f64),
    /// Set the bang-bang output floor/ceiling, percent
    SetPwm { min: i32, max: i32 },
    /// Force the pose estimate
    SetPos { x_ft: f64, y_ft: f64, heading_deg: f64 },
    /// Raw ESC pulse widths, nanoseconds
    Pulse { left_ns: i64, right_ns: i64 },
    /// Stop all motion and dump the telemetry log
    Stop,
    /// Shut the controller down
    Quit,
}

/// Parse one line. Returns None for anything malformed.
pub fn parse(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?.to_ascii_lowercase();

    match verb.as_str() {
        "goto" => {
            let x_ft = parts.next()?.parse().ok()?;
            let y_ft = parts.next()?.parse().ok()?;
            Some(Command::Goto { x_ft, y_ft })
        }
        "speed" => {
            let s: f64 = parts.next()?.parse().ok()?;
            Some(Command::Speed(s.clamp(0.0, 1.0)))
        }
        "setpwm" => {
            let min = parts.next()?.parse().ok()?;
            let max = parts.next()?.parse().ok()?;
            Some(Command::SetPwm { min, max })
        }
        "setpos" => {
            let x_ft = parts.next()?.parse().ok()?;
            let y_ft = parts.next()?.parse().ok()?;
            let heading_deg = parts.next()?.parse().ok()?;
            Some(Command::SetPos {
                x_ft,
                y_ft,
                heading_deg,
            })
        }
        "pulse" => {
            let left_ns = parts.next()?.parse().ok()?;
            let right_ns = parts.next()?.parse().ok()?;
            Some(Command::Pulse { left_ns, right_ns })
        }
        "stop" => Some(Command::Stop),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

/// Read stdin line by line, forwarding parsed commands until EOF, `q`,
/// or shutdown. EOF means the operator went away; treat it as quit.
pub fn spawn_stdin_reader(tx: Sender<Command>, running: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("command-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                let Ok(line) = line else {
                    break;
                };
                if let Some(cmd) = parse(&line) {
                    let quitting = cmd == Command::Quit;
                    if tx.send(cmd).is_err() || quitting {
                        return;
                    }
                }
            }
            // stdin closed underneath us
            let _ = tx.send(Command::Quit);
        })
        .expect("failed to spawn command input thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_goto() {
        assert_eq!(
            parse("goto 3.5 -2"),
            Some(Command::Goto {
                x_ft: 3.5,
                y_ft: -2.0
            })
        );
        // Verbs are case-insensitive
        assert_eq!(
            parse("GOTO 1 1"),
            Some(Command::Goto { x_ft: 1.0, y_ft: 1.0 })
        );
    }

    #[test]
    fn test_parse_speed_clamps() {
        assert_eq!(parse("speed 0.5"), Some(Command::Speed(0.5)));
        assert_eq!(parse("speed 7"), Some(Command::Speed(1.0)));
        assert_eq!(parse("speed -1"), Some(Command::Speed(0.0)));
    }

    #[test]
    fn test_parse_pulse_and_setpos() {
        assert_eq!(
            parse("pulse 2000000 1000000"),
            Some(Command::Pulse {
                left_ns: 2_000_000,
                right_ns: 1_000_000
            })
        );
        assert_eq!(
            parse("setpos 5 5 180"),
            Some(Command::SetPos {
                x_ft: 5.0,
                y_ft: 5.0,
                heading_deg: 180.0
            })
        );
    }

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(parse("stop"), Some(Command::Stop));
        assert_eq!(parse("q"), Some(Command::Quit));
        assert_eq!(parse("  stop  "), Some(Command::Stop));
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("warp 9"), None);
        assert_eq!(parse("goto"), None);
        assert_eq!(parse("goto one two"), None);
        assert_eq!(parse("setpwm 45"), None);
        assert_eq!(parse("pulse 1.5e6 1e6"), None);
    }
}
