use std::str::FromStr;

use common::Coord;
use thiserror::Error;

/// One line typed by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Click(Coord),
    End,
    Update,
    Show,
    Dump,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown command {0:?}; expected `<x> <y>`, end, update, show, dump or quit")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Command, UnknownCommand> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["end"] => Ok(Command::End),
            ["update"] => Ok(Command::Update),
            ["show"] => Ok(Command::Show),
            ["dump"] => Ok(Command::Dump),
            ["quit"] | ["exit"] => Ok(Command::Quit),
            [x, y] => match (x.parse(), y.parse()) {
                (Ok(x), Ok(y)) => Ok(Command::Click(Coord::new(x, y))),
                _ => Err(UnknownCommand(line.trim().to_owned())),
            },
            _ => Err(UnknownCommand(line.trim().to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clicks_and_words() {
        assert_eq!("3 4".parse::<Command>(), Ok(Command::Click(Coord::new(3, 4))));
        assert_eq!("  end ".parse::<Command>(), Ok(Command::End));
        assert_eq!("update".parse::<Command>(), Ok(Command::Update));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_anything_else() {
        assert_eq!(
            "3 x".parse::<Command>(),
            Err(UnknownCommand("3 x".to_owned()))
        );
        assert!("".parse::<Command>().is_err());
        assert!("1 2 3".parse::<Command>().is_err());
    }
}
