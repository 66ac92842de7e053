use crate::shared::constants::{CONFIDENCE_STEP, MAX_CONFIDENCE, MIN_CONFIDENCE};

/// Operator commands handled by the frame loop, never by the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    TogglePause,
    ManualSnapshot,
    RaiseConfidence,
    LowerConfidence,
    Quit,
}

impl ControlCommand {
    /// Parses one line of operator input. Surrounding whitespace is ignored,
    /// except that a line holding only spaces means pause.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if !trimmed.is_empty() && trimmed.trim().is_empty() {
            return Some(ControlCommand::TogglePause);
        }
        match trimmed.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(ControlCommand::TogglePause),
            "s" | "snapshot" => Some(ControlCommand::ManualSnapshot),
            "+" | "=" => Some(ControlCommand::RaiseConfidence),
            "-" => Some(ControlCommand::LowerConfidence),
            "q" | "quit" => Some(ControlCommand::Quit),
            _ => None,
        }
    }
}

/// Applies a confidence step, clamped to the allowed range.
pub fn adjust_confidence(current: f64, command: ControlCommand) -> f64 {
    let next = match command {
        ControlCommand::RaiseConfidence => current + CONFIDENCE_STEP,
        ControlCommand::LowerConfidence => current - CONFIDENCE_STEP,
        _ => current,
    };
    next.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case("p", Some(ControlCommand::TogglePause))]
    #[case(" ", Some(ControlCommand::TogglePause))]
    #[case("S\n", Some(ControlCommand::ManualSnapshot))]
    #[case("+", Some(ControlCommand::RaiseConfidence))]
    #[case("=", Some(ControlCommand::RaiseConfidence))]
    #[case("-", Some(ControlCommand::LowerConfidence))]
    #[case("q", Some(ControlCommand::Quit))]
    #[case("quit\r\n", Some(ControlCommand::Quit))]
    #[case("", None)]
    #[case("x", None)]
    fn test_parse(#[case] line: &str, #[case] expected: Option<ControlCommand>) {
        assert_eq!(ControlCommand::parse(line), expected);
    }

    #[rstest]
    #[case(0.45, ControlCommand::RaiseConfidence, 0.50)]
    #[case(0.45, ControlCommand::LowerConfidence, 0.40)]
    #[case(0.97, ControlCommand::RaiseConfidence, 0.99)]
    #[case(0.07, ControlCommand::LowerConfidence, 0.05)]
    #[case(0.45, ControlCommand::Quit, 0.45)]
    fn test_adjust_confidence(
        #[case] current: f64,
        #[case] command: ControlCommand,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(adjust_confidence(current, command), expected, epsilon = 1e-9);
    }
}
