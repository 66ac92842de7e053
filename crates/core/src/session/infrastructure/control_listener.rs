use std::io::BufRead;

use crossbeam_channel::Sender;

use crate::session::domain::control_command::ControlCommand;

/// Reads operator commands line by line on a background thread.
///
/// Unknown lines are ignored. The thread exits at end of input, after a
/// `Quit`, or once the receiving side is gone.
pub fn spawn_control_listener<R>(
    input: R,
    commands: Sender<ControlCommand>,
) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else {
                break;
            };
            let Some(command) = ControlCommand::parse(&line) else {
                continue;
            };
            if commands.send(command).is_err() || command == ControlCommand::Quit {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_forwards_commands_in_order_and_skips_noise() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = Cursor::new("s\nhello\n+\n-\n");

        spawn_control_listener(input, tx).join().unwrap();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ControlCommand::ManualSnapshot,
                ControlCommand::RaiseConfidence,
                ControlCommand::LowerConfidence,
            ]
        );
    }

    #[test]
    fn test_stops_after_quit() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = Cursor::new("q\ns\n");

        spawn_control_listener(input, tx).join().unwrap();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received, vec![ControlCommand::Quit]);
    }

    #[test]
    fn test_exits_when_receiver_dropped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let input = Cursor::new("s\ns\n");

        spawn_control_listener(input, tx).join().unwrap();
    }
}
