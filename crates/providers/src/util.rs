use lg_domain::error::{Error, ErrorKind};

/// Convert a [`reqwest::Error`] into the domain error kinds from `spec.md`
/// §4.1: network failures are `transport`, non-2xx responses are `upstream`.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        ErrorKind::Transport(e.to_string()).into()
    } else if e.is_status() {
        ErrorKind::Upstream(e.to_string()).into()
    } else {
        ErrorKind::Transport(e.to_string()).into()
    }
}
