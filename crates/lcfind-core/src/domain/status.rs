//! Externally observable host status, carried in the `Status` field of
//! `FIND` and `CONF` replies.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Reconfiguration status a host advertises on the wire.
///
/// The host starts `Disabled` (pure discovery responder). Once the embedding
/// application enables reconfiguration it becomes `Ready`, and a staged
/// change walks it through `AwaitingConfirmation` (only when a human
/// confirmation step is configured) and `Cooldown` (settle window after a
/// change was applied) back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    AwaitingConfirmation,
    Cooldown,
    Disabled,
}

/// A `Status` field value that is not one of the four known spellings.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status value")]
pub struct UnknownStatus;

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These spellings are the wire format; do not localise.
        let s = match self {
            Status::Ready => "Ready",
            Status::AwaitingConfirmation => "AwaitingConfirmation",
            Status::Cooldown => "Cooldown",
            Status::Disabled => "Disabled",
        };
        f.write_str(s)
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ready" => Ok(Status::Ready),
            "awaitingconfirmation" => Ok(Status::AwaitingConfirmation),
            "cooldown" => Ok(Status::Cooldown),
            "disabled" => Ok(Status::Disabled),
            _ => Err(UnknownStatus),
        }
    }
}
