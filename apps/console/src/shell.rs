//! Interactive session. Input lines and view events are handled on one
//! loop so the screen always reflects the current view state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use mc_client::{Assistant, HttpKnowledgeClient};
use mc_core::validation::normalize_max_results;
use mc_core::{HealthIndicator, ViewEvent, ViewModel};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConsoleConfig;
use crate::render;

const HELP: &str = "\
commands:
  ask <question>   ask the knowledge base (plain text works too)
  history          list recent questions
  show <n>         show the answer of history entry n
  clear            clear the history
  expand <n>       expand or collapse source n of the current answer
  max <n>          number of sources to request (1-10)
  upload <path>..  upload one or more documents
  uploads          list uploads
  remove <n>       remove upload n from the list
  health           check the service now
  help             this text
  quit             leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Ask(String),
    History,
    Show(usize),
    Clear,
    Expand(usize),
    Max(u32),
    Upload(Vec<PathBuf>),
    Uploads,
    Remove(usize),
    Health,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    /// Commands are recognised only in their exact form. Anything else,
    /// including a question that happens to start with a command word, is
    /// asked as a question.
    pub fn parse(line: &str) -> ShellCommand {
        let line = line.trim();
        if line.is_empty() {
            return ShellCommand::Empty;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };
        let ask = || ShellCommand::Ask(line.to_string());
        let index = |make: fn(usize) -> ShellCommand, usage: &str| match rest.parse::<usize>() {
            Ok(0) => ShellCommand::Unknown(format!("usage: {}", usage)),
            Ok(n) => make(n),
            Err(_) if rest.is_empty() => ShellCommand::Unknown(format!("usage: {}", usage)),
            Err(_) => ask(),
        };
        match (head.to_ascii_lowercase().as_str(), rest.is_empty()) {
            ("ask", true) => ShellCommand::Unknown("usage: ask <question>".into()),
            ("ask", false) => ShellCommand::Ask(rest.to_string()),
            ("history", true) => ShellCommand::History,
            ("clear", true) => ShellCommand::Clear,
            ("uploads", true) => ShellCommand::Uploads,
            ("health", true) => ShellCommand::Health,
            ("help" | "?", true) => ShellCommand::Help,
            ("quit" | "exit" | "q", true) => ShellCommand::Quit,
            ("show", _) => index(ShellCommand::Show, "show <n>"),
            ("expand", _) => index(ShellCommand::Expand, "expand <n>"),
            ("remove", _) => index(ShellCommand::Remove, "remove <n>"),
            ("max", true) => ShellCommand::Unknown("usage: max <n>".into()),
            ("max", false) => match rest.parse::<u32>() {
                Ok(n) => ShellCommand::Max(n),
                Err(_) => ask(),
            },
            ("upload", true) => ShellCommand::Unknown("usage: upload <path>..".into()),
            ("upload", false) => {
                ShellCommand::Upload(rest.split_whitespace().map(PathBuf::from).collect())
            }
            _ => ask(),
        }
    }
}

struct Shell {
    assistant: Assistant<HttpKnowledgeClient>,
    vm: ViewModel,
    max_results: u32,
    last_indicator: Option<HealthIndicator>,
    pending: Option<JoinHandle<()>>,
}

impl Shell {
    fn print_notifications(&mut self) {
        for note in self.vm.take_notifications() {
            println!("{}", render::notification(&note));
        }
    }

    fn print_response(&self) {
        if let Some(resp) = &self.vm.response {
            println!("{}", render::response(resp, &self.vm.expanded_sources));
        }
    }

    fn on_event(&mut self, event: ViewEvent) {
        let show_response = matches!(
            event,
            ViewEvent::QueryCompleted { .. } | ViewEvent::HistorySelected { .. }
        );
        let health_update = matches!(event, ViewEvent::HealthUpdated { .. });
        self.vm.apply(event);
        self.print_notifications();
        if show_response {
            self.print_response();
        }
        if health_update {
            let now = self.vm.health.indicator();
            if self.last_indicator != Some(now) {
                println!("{}", render::health(&self.vm.health));
                self.last_indicator = Some(now);
            }
        }
    }

    /// Returns false when the session should end.
    async fn on_command(&mut self, cmd: ShellCommand) -> bool {
        match cmd {
            ShellCommand::Empty => {}
            ShellCommand::Quit => return false,
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Unknown(msg) => println!("{}", msg),
            ShellCommand::Ask(question) => {
                let busy = self.pending.as_ref().is_some_and(|t| !t.is_finished());
                if busy || !self.vm.can_submit() {
                    println!("a question is already being answered");
                    return true;
                }
                match self.assistant.submit_query(&question, Some(self.max_results)) {
                    Ok(task) => {
                        self.pending = Some(task);
                        println!("thinking...");
                    }
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::History => print!("{}", render::history(&self.vm.history)),
            ShellCommand::Show(n) => match self.vm.history.get(n - 1) {
                Some(entry) => self.assistant.select_history(&entry.id),
                None => println!("no history entry {}", n),
            },
            ShellCommand::Clear => self.assistant.clear_history(),
            ShellCommand::Expand(n) => {
                let key = self
                    .vm
                    .response
                    .as_ref()
                    .and_then(|r| r.sources.get(n - 1))
                    .map(|s| s.key());
                match key {
                    Some(key) => {
                        self.vm.apply(ViewEvent::SourceToggled(key));
                        self.print_response();
                    }
                    None => println!("no source {}", n),
                }
            }
            ShellCommand::Max(n) => {
                self.max_results = normalize_max_results(Some(n));
                println!("max results: {}", self.max_results);
            }
            ShellCommand::Upload(paths) => {
                let (files, unreadable) = crate::open_files(&paths).await;
                for (path, reason) in unreadable {
                    println!("{}: {}", path.display(), reason);
                }
                if !files.is_empty() {
                    let batch = self.assistant.upload_files(files);
                    debug!(count = batch.ids.len(), "uploads started");
                }
            }
            ShellCommand::Uploads => {
                if self.vm.uploads.is_empty() {
                    println!("  (no uploads)");
                } else {
                    print!("{}", render::uploads(&self.vm.uploads));
                }
            }
            ShellCommand::Remove(n) => match self.vm.uploads.iter().nth(n - 1).map(|u| u.id) {
                Some(id) => self.assistant.remove_upload(id),
                None => println!("no upload {}", n),
            },
            ShellCommand::Health => {
                self.assistant.check_health().await;
                self.last_indicator = None;
            }
        }
        true
    }
}

pub async fn run(cfg: &ConsoleConfig, api: Arc<HttpKnowledgeClient>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let assistant = Assistant::new(api, tx);
    let _poller = assistant.start_health_polling(cfg.health_interval());
    let mut shell = Shell {
        assistant,
        vm: ViewModel::new(),
        max_results: cfg.query.default_max_results,
        last_indicator: None,
        pending: None,
    };

    println!("connected to {} (type 'help' for commands)", cfg.api.base_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !shell.on_command(ShellCommand::parse(&line)).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            Some(event) = rx.recv() => shell.on_event(event),
        }
    }
    if shell.vm.uploads.is_uploading() {
        println!("leaving with uploads still in progress");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            ShellCommand::parse("  What is the max dose of ibuprofen? "),
            ShellCommand::Ask("What is the max dose of ibuprofen?".into())
        );
        assert_eq!(
            ShellCommand::parse("ask  side effects"),
            ShellCommand::Ask("side effects".into())
        );
        assert_eq!(ShellCommand::parse("   "), ShellCommand::Empty);
    }

    #[test]
    fn test_indexed_commands() {
        assert_eq!(ShellCommand::parse("show 2"), ShellCommand::Show(2));
        assert_eq!(ShellCommand::parse("EXPAND 1"), ShellCommand::Expand(1));
        assert_eq!(ShellCommand::parse("remove 3"), ShellCommand::Remove(3));
        assert!(matches!(ShellCommand::parse("show 0"), ShellCommand::Unknown(_)));
        assert!(matches!(ShellCommand::parse("remove"), ShellCommand::Unknown(_)));
    }

    #[test]
    fn test_questions_starting_with_command_words_are_asked() {
        for question in [
            "Clear fluid retention: is it a side effect of ibuprofen?",
            "Health effects of paracetamol overdose?",
            "History of aspirin use in children?",
            "Show me the dosage for amoxicillin",
            "Expand on the interactions of warfarin",
            "Remove what from the diet during statin therapy?",
            "Max daily dose of ibuprofen?",
            "Help with nausea after chemotherapy?",
            "Uploads of lab results: what do they show?",
            "Quit smoking aids and their side effects",
        ] {
            assert_eq!(ShellCommand::parse(question), ShellCommand::Ask(question.into()));
        }
        assert_eq!(ShellCommand::parse("CLEAR"), ShellCommand::Clear);
        assert_eq!(ShellCommand::parse("health"), ShellCommand::Health);
    }

    #[test]
    fn test_upload_and_misc() {
        assert_eq!(
            ShellCommand::parse("upload a.pdf docs/b.txt"),
            ShellCommand::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("docs/b.txt")])
        );
        assert!(matches!(ShellCommand::parse("upload"), ShellCommand::Unknown(_)));
        assert_eq!(ShellCommand::parse("max 20"), ShellCommand::Max(20));
        assert_eq!(ShellCommand::parse("uploads"), ShellCommand::Uploads);
        assert_eq!(ShellCommand::parse("exit"), ShellCommand::Quit);
        assert_eq!(ShellCommand::parse("?"), ShellCommand::Help);
    }
}
