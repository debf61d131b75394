//! Runs every configured session and attaches the console to the primary.

use std::sync::{Arc, Mutex};

use regex::Regex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinSet;

use super::{
    resolve_reply_target, InboundMessage, LifecycleState, Role, Session, SessionEvent,
    SessionHandle,
};
use crate::console::{Console, ConsoleIo, Dispatcher, OutputRouter, OutputSink};
use crate::error::{Error, Result};

/// Console parameters, consumed when the primary session logs in.
pub struct ConsoleSetup {
    pub prompt: String,
    pub io: ConsoleIo,
}

pub struct Orchestrator {
    handles: Vec<Arc<SessionHandle>>,
    router: Arc<OutputRouter>,
    trigger: Regex,
    reply: String,
    console: Mutex<Option<ConsoleSetup>>,
    console_closed: Arc<Notify>,
}

impl Orchestrator {
    /// `primary` is the index into `sessions` of the session that gets the
    /// console.
    pub fn new(
        sessions: Vec<Arc<dyn Session>>,
        primary: usize,
        trigger: Regex,
        reply: impl Into<String>,
        router: Arc<OutputRouter>,
    ) -> Result<Self> {
        if primary >= sessions.len() {
            return Err(Error::Config(format!(
                "primary session index {} out of range ({} sessions)",
                primary,
                sessions.len()
            )));
        }

        let handles = sessions
            .into_iter()
            .enumerate()
            .map(|(i, session)| {
                let role = if i == primary { Role::Primary } else { Role::Secondary };
                Arc::new(SessionHandle::new(session, role))
            })
            .collect();

        Ok(Self {
            handles,
            router,
            trigger,
            reply: reply.into(),
            console: Mutex::new(None),
            console_closed: Arc::new(Notify::new()),
        })
    }

    /// Attach a console to the primary session once it has logged in.
    pub fn with_console(self, setup: ConsoleSetup) -> Self {
        *self.console.lock().unwrap_or_else(|e| e.into_inner()) = Some(setup);
        self
    }

    pub fn handles(&self) -> &[Arc<SessionHandle>] {
        &self.handles
    }

    fn log(&self, session_id: &str, message: &str) {
        let now = chrono::Local::now().format("%H:%M:%S");
        self.router.log(&format!("{} [{}] {}", now, session_id, message));
    }

    /// Start every session concurrently. Returns once each start has
    /// finished, with the number that succeeded.
    pub async fn start_all(self: &Arc<Self>) -> usize {
        let mut starts = JoinSet::new();

        for handle in &self.handles {
            let (tx, mut rx) = mpsc::unbounded_channel();

            let this = Arc::clone(self);
            let pumped = Arc::clone(handle);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    this.handle_event(&pumped, event).await;
                }
                tracing::debug!("Event stream of session {} ended", pumped.id);
            });

            let session = handle.session();
            let id = handle.id.clone();
            starts.spawn(async move { (id, session.start(tx).await) });
        }

        let mut started = 0;
        while let Some(joined) = starts.join_next().await {
            match joined {
                Ok((_, Ok(()))) => started += 1,
                Ok((id, Err(e))) => {
                    tracing::info!("Session {} failed to start: {}", id, e);
                    self.log(&id, &format!("failed to start: {}", e));
                }
                Err(e) => tracing::error!("Session start task failed: {}", e),
            }
        }

        tracing::info!("{}/{} sessions started", started, self.handles.len());
        started
    }

    /// Resolves once the attached console has closed.
    pub async fn console_closed(&self) {
        self.console_closed.notified().await;
    }

    pub async fn handle_event(&self, handle: &Arc<SessionHandle>, event: SessionEvent) {
        match event {
            SessionEvent::Started => {
                handle.advance(LifecycleState::Started);
                self.log(&handle.id, "session started");
            }
            SessionEvent::LoggedIn { account } => {
                handle.advance(LifecycleState::LoggedIn);
                tracing::info!("Session {} logged in as {}", handle.id, account);
                self.log(&handle.id, &format!("logged in as {}", account));
                if handle.is_primary() {
                    self.attach_console(handle);
                }
            }
            SessionEvent::ScanRequested { payload, status } => {
                self.log(&handle.id, &format!("scan requested ({}): {}", status, payload));
            }
            SessionEvent::MessageReceived(message) => self.on_message(handle, message).await,
        }
    }

    async fn on_message(&self, handle: &SessionHandle, message: InboundMessage) {
        if handle.is_primary() {
            let ctx = &message.context;
            let place = match &ctx.room {
                Some(room) => format!("{}@{}", ctx.sender.name, room.topic),
                None => ctx.sender.name.clone(),
            };
            self.log(&handle.id, &format!("{}: {}", place, message.text));
        } else {
            self.log(&handle.id, "<message hidden>");
        }

        if !self.trigger.is_match(&message.text) {
            return;
        }

        let target = match resolve_reply_target(&message.context) {
            Ok(target) => target,
            Err(e) => {
                tracing::info!("Dropping message on session {}: {}", handle.id, e);
                self.log(&handle.id, &e.to_string());
                return;
            }
        };

        let reply = format!("{} [{}]", self.reply, handle.id);
        if let Err(e) = handle.session().say(&target, &reply).await {
            tracing::info!("Reply on session {} failed: {}", handle.id, e);
            self.log(&handle.id, &format!("reply to {} failed: {}", target, e));
        }
    }

    fn attach_console(&self, handle: &SessionHandle) {
        let Some(setup) = self.console.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        let ConsoleSetup {
            prompt,
            io: ConsoleIo { reader, printer },
        } = setup;

        let dispatcher = Dispatcher::new(handle.session().directory(), self.router.clone());
        let console = Console::new(prompt, printer, self.router.clone(), dispatcher);
        tracing::info!("Console attached to session {}", handle.id);

        let closed = Arc::clone(&self.console_closed);
        tokio::spawn(async move {
            console.run(reader).await;
            closed.notify_one();
        });
    }
}
