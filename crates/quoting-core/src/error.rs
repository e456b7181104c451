use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Producer error: {0}")]
	Producer(String),
}
