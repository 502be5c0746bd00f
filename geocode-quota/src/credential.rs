use tokio::{
    io::{
        AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
        Stdin, Stdout,
    },
    sync::Mutex,
};

use crate::Result;

/// Text shown when asking for an API key interactively.
pub const PROMPT: &str = "Enter your API key for the Google Geocoding API: ";

/// Supplies an API credential when none has been stored yet.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a credential. An empty answer is treated as no answer and
    /// the provider may be asked again.
    async fn provide_credential(&self) -> Result<String>;
}

/// A [`CredentialProvider`] returning a fixed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredential(pub String);

#[async_trait::async_trait]
impl CredentialProvider for StaticCredential {
    async fn provide_credential(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A [`CredentialProvider`] that prompts on a writer and reads one line
/// from a reader, by default standard output and standard input.
#[derive(Debug)]
pub struct PromptCredential<R, W> {
    io: Mutex<(R, W)>,
}

impl PromptCredential<BufReader<Stdin>, Stdout> {
    /// Prompts on the process's terminal
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> PromptCredential<R, W> {
    /// Prompts on `writer` and reads the answer from `reader`
    pub fn new(reader: R, writer: W) -> Self {
        Self { io: Mutex::new((reader, writer)) }
    }

    /// Returns the reader and writer
    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }
}

#[async_trait::async_trait]
impl<R, W> CredentialProvider for PromptCredential<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn provide_credential(&self) -> Result<String> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err("input closed before an API key was entered".into());
        }
        Ok(line.trim().to_string())
    }
}
