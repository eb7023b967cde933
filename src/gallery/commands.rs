// Line commands for driving a gallery session from a terminal
//
// Commands:
// - enter: Leave home for the gallery
// - tab <id>: Switch to a collection tab
// - r / reorganize: Re-pack the current tab
// - home: Back to the landing screen
// - open <id>: Open an item in the lightbox
// - close: Close the lightbox
// - show: Print the current view again
// - q / quit: Exit

use super::state::Action;

#[derive(Debug, Clone)]
pub enum Command {
    Dispatch(Action),
    Show,
    Quit,
}

pub const HELP: &str =
    "commands: enter | tab <id> | reorganize | home | open <id> | close | show | quit";

/// Parses one input line. Blank lines re-print the view.
pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(Command::Show);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("Too many arguments: {}", line.trim()));
    }

    let command = match (word.to_ascii_lowercase().as_str(), arg) {
        ("enter", None) => Command::Dispatch(Action::EnterGallery),
        ("tab", Some(id)) => Command::Dispatch(Action::SelectTab(id.to_string())),
        ("r" | "reorganize", None) => Command::Dispatch(Action::Reorganize),
        ("home", None) => Command::Dispatch(Action::ReturnHome),
        ("open", Some(id)) => {
            let id = id
                .parse::<u32>()
                .map_err(|_| format!("Not an item id: {}", id))?;
            Command::Dispatch(Action::OpenMedia(id))
        }
        ("close", None) => Command::Dispatch(Action::CloseMedia),
        ("show", None) => Command::Show,
        ("q" | "quit", None) => Command::Quit,
        _ => return Err(format!("Unknown command: {}\n{}", line.trim(), HELP)),
    };
    Ok(command)
}
