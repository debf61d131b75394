//! End-to-end console and orchestrator behaviour against a local session.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use chatdeck::OutputSink;
use rustyline::error::ReadlineError;

use chatdeck::console::{
    tokenize, ConsoleIo, Dispatcher, LineReader, MemorySink, OutputRouter, WritePrinter,
};
use chatdeck::directory::{SearchEngine, SearchPattern};
use chatdeck::session::orchestrator::ConsoleSetup;
use chatdeck::session::{LifecycleState, LocalSession, MessageContext, Orchestrator, SessionEvent};
use chatdeck::{Contact, Recipient, Room, Session, TargetKind};

fn directory() -> Arc<LocalSession> {
    Arc::new(LocalSession::new(
        "alpha",
        "alpha_bot",
        vec![
            Contact::new("1", "Adam").with_alias("adam"),
            Contact::new("2", "Bob"),
        ],
        vec![Room::new("r1", "Weekend plans"), Room::new("r2", "Admin")],
    ))
}

fn direct_from(sender: Contact) -> MessageContext {
    MessageContext {
        is_from_self: false,
        room: None,
        listener: None,
        sender,
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Replays lines, then reports end of input.
struct Script(VecDeque<rustyline::Result<String>>);

impl LineReader for Script {
    fn read_line(&mut self, _prompt: &str) -> rustyline::Result<String> {
        self.0.pop_front().unwrap_or(Err(ReadlineError::Eof))
    }
}

fn console_setup(lines: Vec<rustyline::Result<String>>, screen: &SharedBuf) -> ConsoleSetup {
    ConsoleSetup {
        prompt: "> ".to_string(),
        io: ConsoleIo::new(Script(lines.into()), WritePrinter(screen.clone())),
    }
}

#[tokio::test]
async fn test_regex_search_finds_single_contact() {
    let engine = SearchEngine::new(directory());
    let report = engine
        .search(&SearchPattern::parse("/.*ad.*/"), Some(TargetKind::Contact))
        .await
        .unwrap();

    let contacts = report.contacts.unwrap().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].name, "Adam");
    assert!(report.rooms.is_none());
}

#[tokio::test]
async fn test_literal_search_escapes_regex() {
    let engine = SearchEngine::new(directory());
    let report = engine.search(&SearchPattern::parse(".*"), None).await.unwrap();

    assert!(report.contacts.unwrap().unwrap().is_empty());
    assert!(report.rooms.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_dedups_name_and_alias_matches() {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = Dispatcher::new(directory(), sink.clone());
    dispatcher.execute(&tokenize("search adam")).await;

    let text = sink.text();
    assert!(text.contains("Matching contacts (1)"));
    assert_eq!(text.matches("Adam").count(), 1);
    assert!(text.contains("No matching rooms found"));
}

#[tokio::test]
async fn test_room_search_matches_topic_only() {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = Dispatcher::new(directory(), sink.clone());
    dispatcher.execute(&tokenize("search ad --targetType room")).await;

    let text = sink.text();
    assert!(text.contains("Matching rooms (1)"));
    assert!(text.contains("Admin"));
    assert!(!text.contains("contacts"));
}

#[tokio::test]
async fn test_send_to_room() {
    let session = directory();
    let sink = Arc::new(MemorySink::new());
    let dispatcher = Dispatcher::new(session.clone(), sink.clone());
    dispatcher
        .execute(&tokenize("send 'Weekend plans' -t room -m \"see you at 8\""))
        .await;

    let sent = session.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Recipient::Room(Room::new("r1", "Weekend plans")));
    assert_eq!(sent[0].1, "see you at 8");
}

fn orchestrator(router: Arc<OutputRouter>) -> (Arc<LocalSession>, Arc<LocalSession>, Orchestrator) {
    let primary = directory();
    let secondary = Arc::new(LocalSession::new("beta", "beta_bot", Vec::new(), Vec::new()));
    let sessions: Vec<Arc<dyn Session>> = vec![primary.clone(), secondary.clone()];
    let orchestrator =
        Orchestrator::new(sessions, 0, Regex::new("^ding$").unwrap(), "dong", router).unwrap();
    (primary, secondary, orchestrator)
}

#[tokio::test]
async fn test_trigger_reply_is_tagged_and_secondary_redacted() {
    let router = Arc::new(OutputRouter::new());
    let sink = Arc::new(MemorySink::new());
    router.attach(sink.clone());
    let (primary, secondary, orchestrator) = orchestrator(router);
    let handles = orchestrator.handles().to_vec();

    let bob = Contact::new("2", "Bob");
    let event = |text: &str| {
        SessionEvent::MessageReceived(chatdeck::session::InboundMessage {
            text: text.to_string(),
            context: direct_from(bob.clone()),
        })
    };

    orchestrator.handle_event(&handles[0], event("hello")).await;
    orchestrator.handle_event(&handles[1], event("ding")).await;

    assert!(primary.sent().is_empty());
    assert_eq!(
        secondary.sent(),
        vec![(Recipient::Contact(bob.clone()), "dong [beta]".to_string())]
    );

    let text = sink.text();
    assert!(text.contains("[alpha] Bob: hello"));
    assert!(text.contains("[beta] <message hidden>"));
    assert!(!text.contains("ding"));
}

#[tokio::test]
async fn test_unresolvable_self_message_is_dropped() {
    let router = Arc::new(OutputRouter::new());
    let sink = Arc::new(MemorySink::new());
    router.attach(sink.clone());
    let (primary, _secondary, orchestrator) = orchestrator(router);
    let handles = orchestrator.handles().to_vec();

    let mut context = direct_from(Contact::new("0", "Me"));
    context.is_from_self = true;
    let event = SessionEvent::MessageReceived(chatdeck::session::InboundMessage {
        text: "ding".to_string(),
        context,
    });
    orchestrator.handle_event(&handles[0], event).await;

    assert!(primary.sent().is_empty());
    assert!(sink.text().contains("Cannot resolve reply target"));
}

#[tokio::test]
async fn test_console_attaches_to_primary_and_closes_on_eof() {
    let router = Arc::new(OutputRouter::new());
    let sink = Arc::new(MemorySink::new());
    router.attach(sink.clone());
    let (_primary, _secondary, orchestrator) = orchestrator(router);

    let screen = SharedBuf::default();
    let orchestrator = Arc::new(
        orchestrator.with_console(console_setup(vec![Ok("ls -c".to_string())], &screen)),
    );

    assert_eq!(orchestrator.start_all().await, 2);
    tokio::time::timeout(Duration::from_secs(5), orchestrator.console_closed())
        .await
        .expect("console did not close");

    let text = screen.text();
    assert!(text.contains("Contacts (2):"));
    assert!(!text.contains("Rooms ("));

    assert!(sink.text().contains("[alpha] logged in as alpha_bot"));
    assert!(sink.lines().contains(&"Bye!".to_string()));
    assert_eq!(orchestrator.handles()[0].state(), LifecycleState::LoggedIn);
}

#[tokio::test]
async fn test_interrupt_closes_console_and_restores_output() {
    let router = Arc::new(OutputRouter::new());
    let sink = Arc::new(MemorySink::new());
    router.attach(sink.clone());
    let (primary, _secondary, orchestrator) = orchestrator(router.clone());

    let screen = SharedBuf::default();
    let lines = vec![
        Err(ReadlineError::Interrupted),
        Ok("send Adam -m 'too late'".to_string()),
    ];
    let orchestrator = Arc::new(orchestrator.with_console(console_setup(lines, &screen)));

    orchestrator.start_all().await;
    tokio::time::timeout(Duration::from_secs(5), orchestrator.console_closed())
        .await
        .expect("console did not close");

    assert!(primary.sent().is_empty());
    router.log("after close");
    let lines = sink.lines();
    assert!(lines.contains(&"Bye!".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("after close"));
    assert!(!screen.text().contains("after close"));
}
