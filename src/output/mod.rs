pub mod formatters;
pub mod senders;

pub use formatters::{create_formatter, ConsoleFormatter, CsvFormatter, DataFormatter, JsonFormatter};
pub use senders::{ConsoleSender, DataSender, FileSender};
