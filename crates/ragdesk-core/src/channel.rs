/// Typed error for channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

/// Incoming message from a channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub text: String,
}

/// Line-oriented conversation endpoint for the chat session.
pub trait Channel: Send {
    /// Receive the next question. Returns `None` when the user ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn recv(&mut self)
    -> impl Future<Output = Result<Option<ChannelMessage>, ChannelError>> + Send;

    /// Send a text response.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Show a short status line. No-op by default.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send_status(
        &mut self,
        _text: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send {
        async { Ok(()) }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;

    use super::{Channel, ChannelError, ChannelMessage};

    /// Scripted channel: yields queued inputs, records everything sent.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedChannel {
        pub inputs: VecDeque<String>,
        pub sent: Vec<String>,
        pub statuses: Vec<String>,
    }

    impl ScriptedChannel {
        pub(crate) fn new(inputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| (*s).to_owned()).collect(),
                ..Self::default()
            }
        }
    }

    impl Channel for ScriptedChannel {
        async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
            Ok(self.inputs.pop_front().map(|text| ChannelMessage { text }))
        }

        async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
            self.sent.push(text.to_owned());
            Ok(())
        }

        async fn send_status(&mut self, text: &str) -> Result<(), ChannelError> {
            self.statuses.push(text.to_owned());
            Ok(())
        }
    }
}
