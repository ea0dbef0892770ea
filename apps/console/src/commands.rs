/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Submit(String),
    Execute,
    DryRun,
    Cancel,
    History,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Type a request in plain language to get a kubectl command proposal.
  /execute   run the proposed command
  /dry-run   show what the proposed command would do
  /cancel    discard the proposal (or the request still being translated)
  /history   print the whole conversation
  /quit      leave";

/// `None` for blank lines.
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(slash) = line.strip_prefix('/') else {
        return Some(ConsoleCommand::Submit(line.to_string()));
    };

    let command = match slash.to_ascii_lowercase().as_str() {
        "execute" | "exec" | "x" => ConsoleCommand::Execute,
        "dry-run" | "dryrun" | "d" => ConsoleCommand::DryRun,
        "cancel" | "c" => ConsoleCommand::Cancel,
        "history" | "h" => ConsoleCommand::History,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.to_string()),
    };
    Some(command)
}
