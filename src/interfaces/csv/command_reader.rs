use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Book,
    Pay,
    Fail,
    Cancel,
    Refund,
    Payout,
}

/// One row of the replay stream. Which columns are required depends on the
/// command type; the CLI validates when applying.
#[derive(Debug, Deserialize, Clone)]
pub struct Command {
    pub r#type: CommandType,
    pub user: Option<Uuid>,
    pub event: Option<Uuid>,
    pub ticket_type: Option<String>,
    pub quantity: Option<u32>,
    pub method: Option<String>,
    /// Caller-chosen booking alias: set by `book`, referenced by the rest.
    pub reference: Option<String>,
    pub amount: Option<Decimal>,
}

/// Streams commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding lazily so large replays never load fully into memory.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let user = Uuid::new_v4();
        let event = Uuid::new_v4();
        let data = format!(
            "type, user, event, ticket_type, quantity, method, reference, amount\n\
             book, {user}, {event}, Regular, 2, , b1, \n\
             pay, , , , , card, b1, \n\
             refund, {user}, , , , , b1, 500"
        );
        let reader = CommandReader::new(data.as_bytes());
        let commands: Vec<Command> = reader.commands().map(|r| r.unwrap()).collect();

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].r#type, CommandType::Book);
        assert_eq!(commands[0].quantity, Some(2));
        assert_eq!(commands[1].method.as_deref(), Some("card"));
        assert_eq!(commands[2].amount, Some(dec!(500)));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, user, event, ticket_type, quantity, method, reference, amount\n\
                    teleport, , , , , , , ";
        let reader = CommandReader::new(data.as_bytes());
        let results: Vec<Result<Command>> = reader.commands().collect();
        assert!(results[0].is_err());
    }
}
