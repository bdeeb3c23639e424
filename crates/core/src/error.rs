use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Config: {0}")]
  Config(String),

  #[error("Unknown agent: {0}")]
  UnknownAgent(String),

  #[error("Pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("IO: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
