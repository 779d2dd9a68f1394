mod config;
mod parser;
mod rule;

pub use config::ConfigError;
pub use parser::ParserError;
pub use rule::RuleError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
