//! Interactive chat session
//!
//! Reads lines from stdin, dispatches slash commands to the store and
//! renders streamed replies from the store's notifications.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use weather_chat_core::{
    ChatNotification, ChatTransport, ConversationStore, MessageRole, StoreError,
};

use crate::commands::{parse_line, resolve_thread_ref, Command, HELP};

/// Prompt shown before each line of input
const PROMPT: &str = "> ";

/// A store plus the terminal it renders to
pub struct ChatSession<T: ChatTransport, W> {
    store: ConversationStore<T>,
    notifications: mpsc::UnboundedReceiver<ChatNotification>,
    out: W,
}

impl<T, W> ChatSession<T, W>
where
    T: ChatTransport + 'static,
    W: AsyncWrite + Unpin,
{
    /// Wrap `store`, subscribing to its notifications
    pub fn new(store: ConversationStore<T>, out: W) -> Self {
        let (tx, notifications) = mpsc::unbounded_channel();
        Self {
            store: store.with_notifications(tx),
            notifications,
            out,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &ConversationStore<T> {
        &self.store
    }

    /// Run until `/quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.write("Weather chat. Type /help for commands.\n").await?;
        loop {
            self.write(PROMPT).await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.handle_line(&line).await? {
                break;
            }
        }
        Ok(())
    }

    /// Handle one line of input; returns false when the session should end
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        let Some(command) = parse_line(line) else {
            return Ok(true);
        };
        debug!(command = ?command, "Handling input");

        match command {
            Command::Send(text) => self.send(&text).await?,
            Command::New(title) => {
                let title = title.unwrap_or_else(|| self.store.config().default_thread_title.clone());
                self.store.create_thread(title.clone());
                self.write(&format!("Started \"{title}\"\n")).await?;
            }
            Command::Threads => self.list_threads().await?,
            Command::Switch(target) => self.switch(&target).await?,
            Command::Rename(title) => self.rename(&title).await?,
            Command::Clear => {
                if self.store.state().active_thread_id().is_some() {
                    self.store.clear_thread(None);
                    self.write("Thread cleared\n").await?;
                } else {
                    self.write("No active thread\n").await?;
                }
            }
            Command::Delete(target) => self.delete(target.as_deref()).await?,
            Command::Export(dir) => self.export(dir).await?,
            Command::Help => self.write(&format!("{HELP}\n")).await?,
            Command::Quit => return Ok(false),
            Command::Invalid(input) => {
                self.write(&format!("Unknown command: {input} (try /help)\n"))
                    .await?;
            }
        }
        Ok(true)
    }

    /// Send a message and render the reply as it streams
    pub async fn send(&mut self, text: &str) -> Result<()> {
        match self.store.send_message(text) {
            Ok(()) => {}
            Err(StoreError::ConcurrentSendRejected) => {
                warn!("Send rejected while a reply is streaming");
                return Ok(());
            }
            Err(e) => {
                debug!(error = %e, "Send ignored");
                return Ok(());
            }
        }

        self.render_notifications().await?;
        while self.store.next_update().await {
            self.render_notifications().await?;
        }
        self.render_notifications().await
    }

    async fn render_notifications(&mut self) -> Result<()> {
        while let Ok(notification) = self.notifications.try_recv() {
            match notification {
                ChatNotification::ThreadCreated { title, .. } => {
                    self.write(&format!("[new thread: {title}]\n")).await?;
                }
                ChatNotification::Token { text, .. } => self.write(&text).await?,
                ChatNotification::StreamEnd { .. } => self.write("\n").await?,
                ChatNotification::StreamError { error, .. } => {
                    self.write(&format!("\n[error] {error}\n")).await?;
                }
            }
        }
        Ok(())
    }

    async fn list_threads(&mut self) -> Result<()> {
        let active = self.store.state().active_thread_id().cloned();
        let listing: Vec<String> = self
            .store
            .thread_list()
            .iter()
            .enumerate()
            .map(|(i, thread)| {
                let marker = if Some(&thread.id) == active.as_ref() { '*' } else { ' ' };
                format!(
                    "{marker} {}. {} ({} messages, {})\n",
                    i + 1,
                    thread.title,
                    thread.messages.len(),
                    thread.last_activity.format("%Y-%m-%d %H:%M")
                )
            })
            .collect();

        if listing.is_empty() {
            self.write("No threads yet\n").await?;
        }
        for line in listing {
            self.write(&line).await?;
        }
        Ok(())
    }

    async fn switch(&mut self, target: &str) -> Result<()> {
        let resolved = resolve_thread_ref(&self.store.thread_list(), target);
        let Some(id) = resolved else {
            return self.write(&format!("No thread matches \"{target}\"\n")).await;
        };
        self.store.set_active_thread(&id)?;

        let transcript: Vec<String> = self
            .store
            .active_messages()
            .iter()
            .map(|m| {
                let who = match m.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "agent",
                };
                format!("{who}: {}\n", m.content)
            })
            .collect();
        for line in transcript {
            self.write(&line).await?;
        }
        Ok(())
    }

    async fn rename(&mut self, title: &str) -> Result<()> {
        let active = self
            .store
            .state()
            .active_thread()
            .map(|t| (t.id.clone(), t.title.clone()));
        let Some((id, current)) = active else {
            return self.write("No active thread\n").await;
        };
        let title = title.trim();
        if title.is_empty() || title == current {
            return self.write("Title unchanged\n").await;
        }
        self.store.update_thread_title(&id, title);
        self.write(&format!("Renamed to \"{title}\"\n")).await
    }

    async fn delete(&mut self, target: Option<&str>) -> Result<()> {
        let id = match target {
            Some(target) => resolve_thread_ref(&self.store.thread_list(), target),
            None => self.store.state().active_thread_id().cloned(),
        };
        let Some(id) = id else {
            return self.write("No thread to delete\n").await;
        };
        self.store.delete_thread(&id);
        self.write("Thread deleted\n").await
    }

    async fn export(&mut self, dir: Option<PathBuf>) -> Result<()> {
        let Some(export) = self.store.export_thread(None) else {
            return self.write("No active thread\n").await;
        };
        let dir = dir.unwrap_or_else(|| PathBuf::from("."));
        let path = export.write_to_dir(&dir).await?;
        self.write(&format!("Exported to {}\n", path.display())).await
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use weather_chat_core::{ChatConfig, HttpTransport, WeatherRequestBuilder};

    use super::*;

    fn session() -> ChatSession<HttpTransport, Vec<u8>> {
        let config = ChatConfig::default();
        let transport = Arc::new(HttpTransport::from_config(&config).unwrap());
        let builder = Arc::new(WeatherRequestBuilder::new(config.request.clone()));
        let store = ConversationStore::new(transport, builder, config.store.clone());
        ChatSession::new(store, Vec::new())
    }

    fn output(session: &ChatSession<HttpTransport, Vec<u8>>) -> String {
        String::from_utf8_lossy(&session.out).to_string()
    }

    #[tokio::test]
    async fn test_thread_management_commands() {
        let mut session = session();

        assert!(session.handle_line("/new Alps").await.unwrap());
        assert!(session.handle_line("/new").await.unwrap());
        assert_eq!(session.store().state().threads().len(), 2);
        assert_eq!(session.store().state().active_thread().unwrap().title, "New Chat");

        session.handle_line("/switch 2").await.unwrap();
        assert_eq!(session.store().state().active_thread().unwrap().title, "Alps");

        session.handle_line("/rename  Dolomites ").await.unwrap();
        assert_eq!(
            session.store().state().active_thread().unwrap().title,
            "Dolomites"
        );

        session.handle_line("/delete").await.unwrap();
        assert_eq!(session.store().state().threads().len(), 1);
        assert_eq!(session.store().state().active_thread().unwrap().title, "New Chat");

        assert!(!session.handle_line("/quit").await.unwrap());
        assert!(output(&session).contains("Renamed to \"Dolomites\""));
    }

    #[tokio::test]
    async fn test_rename_rejects_unchanged_title() {
        let mut session = session();
        session.handle_line("/new Alps").await.unwrap();

        session.handle_line("/rename Alps").await.unwrap();
        assert!(output(&session).contains("Title unchanged"));
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.handle_line("/new Alps").await.unwrap();

        session
            .handle_line(&format!("/export {}", dir.path().display()))
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert!(output(&session).contains("Exported to"));
    }

    #[tokio::test]
    async fn test_unknown_command_and_blank_input() {
        let mut session = session();
        assert!(session.handle_line("").await.unwrap());
        assert!(session.handle_line("/forecast").await.unwrap());
        assert!(output(&session).contains("Unknown command: /forecast"));
        assert!(session.store().state().threads().is_empty());
    }
}
