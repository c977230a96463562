pub mod settings;

pub use settings::{
    Config,
    OutputConfig,
    ParityConfig,
    PollingConfig,
    ResponseWait,
    UartConfig,
};
