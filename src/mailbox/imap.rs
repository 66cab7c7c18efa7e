//! Read-only IMAP access built on `async-imap`.
//!
//! Sessions connect over implicit TLS, STARTTLS or plaintext, open folders
//! with `EXAMINE` and fetch with `BODY.PEEK[]`, so scanning never changes
//! message flags. Every network operation is bounded by the connector's
//! timeout.

use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_imap::error::Error as ImapError;
use async_imap::types::Fetch;
use async_imap::{Client, Session};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use super::{MailboxConnector, MailboxSession, RawMessage};
use crate::config::{AccountConfig, Security, MAX_MESSAGE_BYTES};
use crate::error_handling::MailboxError;

/// Any byte stream a session can run over (plain TCP or TLS).
trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + Debug {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + Debug> ImapStream for T {}

type Stream = Box<dyn ImapStream>;

/// Connects to IMAP servers.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    timeout: Duration,
}

impl ImapConnector {
    /// Creates a connector applying `timeout` to every network operation.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    async fn connect(
        &self,
        account: &AccountConfig,
    ) -> Result<Box<dyn MailboxSession>, MailboxError> {
        let session = ImapSession::open(account, self.timeout).await?;
        Ok(Box::new(session))
    }
}

struct ImapSession {
    session: Session<Stream>,
    timeout: Duration,
    /// Folder currently opened with `EXAMINE`, as configured (not encoded)
    selected: Option<String>,
    account: String,
}

impl ImapSession {
    async fn open(account: &AccountConfig, op_timeout: Duration) -> Result<Self, MailboxError> {
        check_credential("username", &account.username)?;
        check_credential("password", &account.password)?;

        log::debug!(
            "[{}] Connecting to {}:{} ({:?})",
            account.name,
            account.host,
            account.port,
            account.security
        );
        let address = (account.host.as_str(), account.port);
        let sock = timeout(op_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| MailboxError::Timeout("connect"))??;

        let stream: Stream = match account.security {
            Security::Ssl => Box::new(tls_handshake(&account.host, sock, op_timeout).await?),
            Security::Starttls => {
                let mut client = Client::new(sock);
                timeout(op_timeout, client.run_command_and_check_ok("STARTTLS", None))
                    .await
                    .map_err(|_| MailboxError::Timeout("STARTTLS"))?
                    .map_err(|e| imap_error("STARTTLS", e))?;
                let sock = client.into_inner();
                Box::new(tls_handshake(&account.host, sock, op_timeout).await?)
            }
            Security::None => {
                log::warn!(
                    "[{}] Logging in over an unencrypted connection to {}",
                    account.name,
                    account.host
                );
                Box::new(sock)
            }
        };

        let client = Client::new(stream);
        let session = timeout(
            op_timeout,
            client.login(&account.username, &account.password),
        )
        .await
        .map_err(|_| MailboxError::Timeout("LOGIN"))?
        .map_err(|(e, _)| imap_error("LOGIN", e))?;
        log::info!("[{}] Logged in to {}", account.name, account.host);

        Ok(Self {
            session,
            timeout: op_timeout,
            selected: None,
            account: account.name.clone(),
        })
    }

    async fn select(&mut self, folder: &str) -> Result<(), MailboxError> {
        if self.selected.as_deref() == Some(folder) {
            return Ok(());
        }
        self.selected = None;
        let encoded = encode_folder(folder);
        log::debug!("[{}] EXAMINE {encoded}", self.account);
        timeout(self.timeout, self.session.examine(&encoded))
            .await
            .map_err(|_| MailboxError::Timeout("EXAMINE"))?
            .map_err(|e| imap_error("EXAMINE", e))?;
        self.selected = Some(folder.to_string());
        Ok(())
    }

    /// Discards untagged responses nobody asked for (EXISTS, EXPUNGE, ...)
    /// so the session's bounded channel never fills up.
    fn drain_unsolicited(&mut self) {
        let mut dropped = 0usize;
        while self.session.unsolicited_responses.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::trace!("[{}] Dropped {dropped} unsolicited responses", self.account);
        }
    }
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn list(&mut self, folder: &str, since: NaiveDate) -> Result<Vec<u32>, MailboxError> {
        self.select(folder).await?;
        let query = format!("SINCE {}", imap_date(since));
        let found = timeout(self.timeout, self.session.uid_search(&query))
            .await
            .map_err(|_| MailboxError::Timeout("UID SEARCH"))?
            .map_err(|e| imap_error("UID SEARCH", e))?;
        self.drain_unsolicited();

        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        log::debug!(
            "[{}] {} messages in {folder} since {since}",
            self.account,
            uids.len()
        );
        Ok(uids)
    }

    async fn fetch(&mut self, folder: &str, uid: u32) -> Result<Option<RawMessage>, MailboxError> {
        self.select(folder).await?;
        let session = &mut self.session;
        let fetches: Vec<Fetch> = timeout(self.timeout, async {
            let stream = session
                .uid_fetch(uid.to_string(), "(INTERNALDATE BODY.PEEK[])")
                .await?;
            stream.try_collect().await
        })
        .await
        .map_err(|_| MailboxError::Timeout("UID FETCH"))?
        .map_err(|e| imap_error("UID FETCH", e))?;
        self.drain_unsolicited();

        let Some((fetch, body)) = fetches
            .iter()
            .find_map(|fetch| fetch.body().map(|body| (fetch, body)))
        else {
            return Ok(None);
        };
        if body.len() > MAX_MESSAGE_BYTES {
            return Err(MailboxError::Protocol(format!(
                "Message {uid} is {} bytes, limit is {MAX_MESSAGE_BYTES}",
                body.len()
            )));
        }
        Ok(Some(RawMessage {
            folder: folder.to_string(),
            uid,
            received: fetch.internal_date(),
            bytes: body.to_vec(),
        }))
    }

    async fn logout(&mut self) -> Result<(), MailboxError> {
        timeout(self.timeout, self.session.logout())
            .await
            .map_err(|_| MailboxError::Timeout("LOGOUT"))?
            .map_err(|e| imap_error("LOGOUT", e))?;
        log::debug!("[{}] Logged out", self.account);
        Ok(())
    }
}

async fn tls_handshake<S>(
    host: &str,
    stream: S,
    op_timeout: Duration,
) -> Result<tokio_rustls::client::TlsStream<S>, MailboxError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| MailboxError::Tls(format!("Invalid server name {host}: {e}")))?;

    let connector = TlsConnector::from(Arc::new(config));
    timeout(op_timeout, connector.connect(server_name, stream))
        .await
        .map_err(|_| MailboxError::Timeout("TLS handshake"))?
        .map_err(|e| MailboxError::Tls(format!("TLS handshake with {host} failed: {e}")))
}

/// Maps a client error onto the mailbox error kinds the run distinguishes:
/// server refusals, lost connections and everything else.
fn imap_error(command: &str, error: ImapError) -> MailboxError {
    match error {
        ImapError::No(response) | ImapError::Bad(response) => MailboxError::Rejected {
            command: command.to_string(),
            response,
        },
        ImapError::Io(e) => MailboxError::Io(e),
        ImapError::ConnectionLost => MailboxError::Io(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            format!("Connection lost during {command}"),
        )),
        other => MailboxError::Protocol(format!("{command}: {other}")),
    }
}

/// Login arguments go out as quoted strings, which cannot carry line breaks.
fn check_credential(field: &str, value: &str) -> Result<(), MailboxError> {
    if value.contains(['\r', '\n']) {
        return Err(MailboxError::Protocol(format!(
            "The {field} contains a line break"
        )));
    }
    Ok(())
}

/// Encodes a folder name as modified UTF-7 (RFC 3501 section 5.1.3).
fn encode_folder(folder: &str) -> String {
    utf7_imap::encode_utf7_imap(folder.to_string())
}

/// Formats a date for `SEARCH SINCE`.
fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}
