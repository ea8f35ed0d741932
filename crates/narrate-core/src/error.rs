use http::StatusCode;

/// How a job failure is reported, both to the caller and to the logs
///
/// The jobs crate renders implementors as `{ "error": <client_message> }`
/// with [`status_code`](Self::status_code). Internal detail such as
/// filesystem paths stays in the `Display` text and never reaches the
/// client message.
pub trait HttpError: std::error::Error {
    /// Response status for this failure
    fn status_code(&self) -> StatusCode;

    /// Stable label for the failure class, logged with every failed job
    /// (e.g. `execution_timeout`)
    fn error_type(&self) -> &str;

    /// Message safe to return to the caller
    fn client_message(&self) -> String;
}
