use thiserror::Error;

#[derive(Error, Debug)]
pub enum WxPayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WeChat Pay API error: code={code}, message={message}")]
    Api { code: String, message: String },

    #[error("No bill exists for {bill_date}")]
    NoBillExist { bill_date: String },

    #[error("Unknown WeChat Pay error: {0}")]
    Unknown(String),

    #[error("Request method should be \"GET\" or \"POST\", got {0:?}")]
    InvalidMethod(String),

    #[error("Invalid bill date {0:?}, expected YYYYMMDD")]
    InvalidDate(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bill CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
