use speedo_lib::TripCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(TripCommand),
    Status,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Option<Result<Input, String>> {
    let word = line.trim().to_lowercase();
    if word.is_empty() {
        return None;
    }

    let input = match word.as_str() {
        "start" | "play" => Input::Command(TripCommand::Start),
        "resume" => Input::Command(TripCommand::Resume),
        "pause" => Input::Command(TripCommand::Pause),
        "stop" => Input::Command(TripCommand::Stop),
        "reset" => Input::Command(TripCommand::Reset),
        "status" | "s" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        _ => return Some(Err(format!("Unknown command {:?}, type `help`", word))),
    };

    Some(Ok(input))
}

pub const HELP: &str = "commands: start | pause | resume | stop | reset | status | quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("start"), Some(Ok(Input::Command(TripCommand::Start))));
        assert_eq!(parse_line("  Play \n"), Some(Ok(Input::Command(TripCommand::Start))));
        assert_eq!(parse_line("RESET"), Some(Ok(Input::Command(TripCommand::Reset))));
        assert_eq!(parse_line("q"), Some(Ok(Input::Quit)));
        assert_eq!(parse_line("status"), Some(Ok(Input::Status)));
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_line("   "), None);
        assert!(matches!(parse_line("faster"), Some(Err(_))));
    }
}
