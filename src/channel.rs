use ragdesk_core::channel::{Channel, ChannelError, ChannelMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Line-based terminal channel. `exit`, `quit`, an empty line or EOF end the session.
pub struct CliChannel<R, W> {
    reader: R,
    writer: W,
    prompt: &'static str,
}

impl CliChannel<BufReader<Stdin>, Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> CliChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            prompt: "You: ",
        }
    }

    #[cfg(test)]
    fn into_writer(self) -> W {
        self.writer
    }

    async fn write_flush(&mut self, text: &str) -> Result<(), ChannelError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl<R, W> Channel for CliChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        self.write_flush(self.prompt).await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("exit")
            || trimmed.eq_ignore_ascii_case("quit")
        {
            return Ok(None);
        }
        Ok(Some(ChannelMessage {
            text: trimmed.to_owned(),
        }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write_flush(&format!("\n{text}\n")).await
    }

    async fn send_status(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write_flush(&format!("[{text}]\n")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(input: &str) -> CliChannel<&[u8], Vec<u8>> {
        CliChannel::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn reads_trimmed_lines() {
        let mut ch = channel("  what is this?  \nnext\n");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "what is this?");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "next");
        assert!(ch.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exit_words_end_session() {
        for input in ["exit\n", "QUIT\n", "\n", ""] {
            let mut ch = channel(input);
            assert!(ch.recv().await.unwrap().is_none(), "input {input:?}");
        }
    }

    #[tokio::test]
    async fn prompts_and_sends_to_writer() {
        let mut ch = channel("hello\n");
        ch.recv().await.unwrap();
        ch.send_status("Thinking...").await.unwrap();
        ch.send("Answer: hi").await.unwrap();
        let out = String::from_utf8(ch.into_writer()).unwrap();
        assert_eq!(out, "You: [Thinking...]\n\nAnswer: hi\n");
    }
}
