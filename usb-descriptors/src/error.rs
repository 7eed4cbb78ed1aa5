use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("malformed JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("expected an array of device records, found {0}")]
    UnexpectedShape(&'static str),
    #[error("malformed device record: {0}")]
    Record(#[from] serde_json::Error),
}
