//! Single-channel connection with exclusive access.
//!
//! The server runs one query at a time per connection, so a [`Connection`]
//! never queues: a call that finds another call in progress fails at once
//! with [`Error::ConnectionInUse`].
//!
//! The physical transport is opened lazily and kept between calls. It has a
//! lifetime of its own, separate from the caller's [`Context`]. When a call's
//! context ends mid-exchange the point the server reached is unknown, so the
//! transport lifetime is canceled, the connection force-closed, and the next
//! call opens a fresh one.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tds_channel::{Channel, Conn, DialInfo, LoginConfig, Package, Transport, TransportError};
use tokio_util::sync::CancellationToken;

use crate::collector::{StopError, collect_until, until_final};
use crate::context::Context;
use crate::error::{Error, Failure, Result, classify};
use crate::parser::parse_results;
use crate::query::Query;
use crate::row::ExecResult;

/// Object-safe query executor.
///
/// Implemented by [`Connection`] so callers can hold a
/// `Box<dyn ExecutorCloser>` without naming the transport.
#[async_trait::async_trait]
pub trait ExecutorCloser: Send + Sync {
    /// Run one query and return its rows and affected row count.
    ///
    /// Returns [`Error::Context`] if `ctx` ends first.
    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult>;

    /// Close the underlying transport.
    async fn close(&self) -> Result<()>;
}

/// Open transport and its single channel.
struct Session<C: Conn> {
    conn: C,
    channel: C::Channel,
    lifetime: CancellationToken,
}

impl<C: Conn> Session<C> {
    /// Dial, open the channel and log in.
    ///
    /// A failure at any step cancels the new lifetime.
    async fn open<T>(
        transport: &T,
        dial: &DialInfo,
        login: &LoginConfig,
    ) -> std::result::Result<Self, TransportError>
    where
        T: Transport<Conn = C>,
    {
        let lifetime = CancellationToken::new();
        let guard = lifetime.clone().drop_guard();

        let (conn, channel) = tokio::time::timeout(dial.connect_timeout, async {
            let mut conn = transport.dial(dial, lifetime.clone()).await?;
            // the server does not multiplex; one channel serves every query
            let mut channel = conn.new_channel().await?;
            channel.login(login).await?;
            Ok::<_, TransportError>((conn, channel))
        })
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        guard.disarm();
        Ok(Self {
            conn,
            channel,
            lifetime,
        })
    }

    /// Close the transport. An already-canceled lifetime is not an error.
    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        match self.conn.close().await {
            Err(TransportError::Canceled) => Ok(()),
            other => other,
        }
    }

    /// Cancel the lifetime, then force-close, discarding any close error.
    async fn teardown(mut self) {
        self.lifetime.cancel();
        if let Err(e) = self.close().await {
            tracing::warn!(error = %e, "discarding close error during teardown");
        }
    }
}

impl<C: Conn> Drop for Session<C> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// Releases the exclusive-use flag when dropped.
struct InUse<'a>(&'a AtomicBool);

impl Drop for InUse<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A lazily opened connection to one server.
///
/// Share it between tasks behind an `Arc`; concurrent calls fail with
/// [`Error::ConnectionInUse`] rather than wait.
pub struct Connection<T: Transport> {
    transport: Arc<T>,
    dial: DialInfo,
    login: LoginConfig,
    in_use: AtomicBool,
    session: Mutex<Option<Session<T::Conn>>>,
}

impl<T: Transport> Connection<T> {
    pub(crate) fn new(transport: Arc<T>, dial: DialInfo, login: LoginConfig) -> Self {
        Self {
            transport,
            dial,
            login,
            in_use: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    /// Server address this connection dials.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.dial.address
    }

    /// Check if a transport is currently held.
    ///
    /// Returns `false` while a call is running, since the call owns the
    /// transport for its duration.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Check if a call is currently running.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    fn claim(&self) -> Result<InUse<'_>> {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InUse(&self.in_use))
            .map_err(|_| Error::ConnectionInUse)
    }

    /// Run one query.
    ///
    /// Opens the transport first if needed. If `ctx` ends before the
    /// response is complete, the transport is torn down and the context
    /// error is returned.
    pub async fn execute(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        let _in_use = self.claim()?;
        let mut slot = self.session.lock().take();

        let outcome = tokio::select! {
            biased;
            err = ctx.done() => Err(Error::from(err)),
            result = self.exchange(&mut slot, query) => result,
        };

        if matches!(outcome, Err(Error::Context(_))) {
            if let Some(session) = slot.take() {
                tracing::warn!(
                    address = %self.dial.address,
                    "call interrupted, tearing down connection"
                );
                session.teardown().await;
            }
        }

        *self.session.lock() = slot;
        outcome
    }

    /// Close the transport if one is open.
    pub async fn close(&self) -> Result<()> {
        let _in_use = self.claim()?;
        let Some(mut session) = self.session.lock().take() else {
            return Ok(());
        };

        tracing::debug!(address = %self.dial.address, "closing connection");
        session
            .close()
            .await
            .map_err(|e| classify(Failure::Connection, Some(e)))
    }

    /// Open the transport now rather than on first use.
    pub(crate) async fn open(&self, ctx: &Context) -> Result<()> {
        let _in_use = self.claim()?;
        let mut slot = self.session.lock().take();

        let outcome = tokio::select! {
            biased;
            err = ctx.done() => Err(Error::from(err)),
            result = self.ensure_open(&mut slot) => result.map(|_| ()),
        };

        *self.session.lock() = slot;
        outcome
    }

    async fn ensure_open<'s>(
        &self,
        slot: &'s mut Option<Session<T::Conn>>,
    ) -> Result<&'s mut Session<T::Conn>> {
        let session = match slot.take() {
            Some(session) => session,
            None => {
                let session = Session::open(&*self.transport, &self.dial, &self.login)
                    .await
                    .map_err(|e| classify(Failure::Connection, Some(e)))?;
                tracing::info!(
                    address = %self.dial.address,
                    user = %self.login.user,
                    app_name = %self.login.app_name,
                    "connection opened"
                );
                session
            }
        };
        Ok(slot.insert(session))
    }

    async fn exchange(
        &self,
        slot: &mut Option<Session<T::Conn>>,
        query: &Query,
    ) -> Result<ExecResult> {
        let session = self.ensure_open(slot).await?;

        tracing::debug!(sql = %query.sql, "sending query");
        if let Err(e) = session
            .channel
            .send_package(Package::language(query.sql.as_str()))
            .await
        {
            session.channel.reset();
            return Err(classify(Failure::Query, Some(e)));
        }

        let collected = collect_until(&mut session.channel, until_final).await;
        tracing::debug!(
            packages = collected.packages.len(),
            stop = ?collected.stop,
            "response collected"
        );

        let stopped_on_error = match collected.stop {
            None => false,
            Some(StopError::TranFailed) => true,
            // the server closes the stream once everything is sent
            Some(StopError::Transport(e)) if e.is_eof() => false,
            Some(StopError::Transport(e)) => return Err(classify(Failure::Query, Some(e))),
        };

        parse_results(collected.packages, stopped_on_error)
    }
}

#[async_trait::async_trait]
impl<T: Transport> ExecutorCloser for Connection<T> {
    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        self.execute(ctx, query).await
    }

    async fn close(&self) -> Result<()> {
        Connection::close(self).await
    }
}

impl<T: Transport> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.dial.address)
            .field("login", &self.login)
            .field("in_use", &self.is_in_use())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
