//! The request/save loop for one invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chat_provider::{ChatProvider, ChatTurn, CompletionRequest};
use dotchat::{derive_filename_with_extension, Message, Session, USER_ROLE};
use session_store::{read_session, write_session, HistoryLedger};

use crate::cli::PREVIOUS_SESSION_ARG;
use crate::config::{Assume, Settings};
use crate::console::{Console, SaveChoice};
use crate::error::classify_session_error;
use crate::markdown::MarkdownRenderer;

/// Files written during one run, in save order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub saved: Vec<PathBuf>,
}

pub struct App<C> {
    settings: Settings,
    assume: Assume,
    provider: Arc<dyn ChatProvider>,
    console: C,
    working_dir: PathBuf,
}

impl<C: Console> App<C> {
    pub fn new(
        settings: Settings,
        assume: Assume,
        provider: Arc<dyn ChatProvider>,
        console: C,
    ) -> Self {
        Self {
            settings,
            assume,
            provider,
            console,
            working_dir: PathBuf::from("."),
        }
    }

    /// Directory used for new sessions when `current_directory` is set.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    fn ledger(&self) -> HistoryLedger {
        HistoryLedger::new(&self.settings.history_file)
    }

    /// Runs request cycles until the user stops or declines to save.
    ///
    /// `filename` names the session to resume; `-` picks the most recent one from
    /// the history ledger.
    pub fn run(&mut self, filename: Option<&str>) -> Result<RunOutcome> {
        let mut target = self.resolve_target(filename)?;
        let mut session = match &target {
            Some(path) => self.load_session(path)?,
            None => Session::new(),
        };
        let interactive = self.console.stdin_is_terminal();
        let mut outcome = RunOutcome::default();

        loop {
            self.take_user_turn(&mut session, interactive)?;

            let turns = session
                .admit()
                .map_err(classify_session_error)
                .context("checking conversation before request")?
                .iter()
                .map(to_turn)
                .collect::<Vec<_>>();
            let reply = self
                .complete(CompletionRequest::new(turns, self.settings.system_prompt.clone()))
                .context("requesting reply")?;
            session
                .record_reply(Message::new(reply.role, reply.content))
                .context("recording reply")?;

            if let Some(reply) = session.reply() {
                let terminal = self.console.stdout_is_terminal();
                let use_pager = terminal && !self.settings.no_pager;
                let text = if terminal && !self.settings.no_rich {
                    MarkdownRenderer::default().render(reply.content())
                } else {
                    reply.content().to_string()
                };
                self.console
                    .show_reply(&text, use_pager)
                    .context("displaying reply")?;
            }

            let choice = match self.assume {
                Assume::Yes => SaveChoice::Yes,
                Assume::No => SaveChoice::No,
                Assume::Prompt => self.console.ask_save()?,
            };
            if choice == SaveChoice::No {
                tracing::debug!("conversation not saved");
                break;
            }

            let path = match target.take() {
                Some(path) => path,
                None => self.name_session(&session).context("naming session")?,
            };
            let written = self.save(&mut session, &path)?;
            outcome.saved.push(written.clone());
            target = Some(written);

            if choice != SaveChoice::Continue {
                break;
            }
            session.next_cycle().context("starting next turn")?;
        }

        Ok(outcome)
    }

    fn resolve_target(&mut self, filename: Option<&str>) -> Result<Option<PathBuf>> {
        match filename {
            None => Ok(None),
            Some(PREVIOUS_SESSION_ARG) => {
                let ledger = self.ledger();
                let Some(previous) = ledger.latest().context("reading session history")? else {
                    bail!(
                        "no previous session recorded in {}",
                        ledger.path().display()
                    );
                };
                self.console.notice(&format!(
                    "Resuming from previous session: {}",
                    previous.display()
                ));
                Ok(Some(previous))
            }
            Some(name) => Ok(Some(PathBuf::from(name))),
        }
    }

    fn load_session(&self, path: &Path) -> Result<Session> {
        match read_session(path).context("loading session")? {
            Some(text) => Session::load(&text)
                .with_context(|| format!("loading session {}", path.display())),
            None => {
                tracing::debug!(path = %path.display(), "session file does not exist yet");
                Ok(Session::new())
            }
        }
    }

    fn take_user_turn(&mut self, session: &mut Session, interactive: bool) -> Result<()> {
        if interactive {
            let reverse = self.settings.reverse;
            let buffer = session.editor_buffer(reverse);
            let edited = self
                .console
                .edit(&buffer, &self.settings.extension, reverse)
                .context("editing conversation")?;
            session
                .apply_edit(&edited, reverse)
                .context("reading edited conversation")
        } else {
            let input = self.console.read_stdin()?;
            session
                .append_input(&input)
                .context("reading conversation from stdin")
        }
    }

    fn complete(&self, request: CompletionRequest) -> Result<ChatTurn> {
        let profile = self.provider.profile();
        tracing::info!(
            provider = %profile.provider_id,
            model = %profile.model_id,
            turns = request.turns.len(),
            "requesting completion"
        );
        self.provider.complete(request).map_err(|error| anyhow!(error))
    }

    /// `{summary-slug}-{fingerprint}{ext}` in the session directory.
    fn name_session(&self, session: &Session) -> Result<PathBuf> {
        let turns = session.messages().iter().map(to_turn).collect();
        let request = CompletionRequest::new(turns, self.settings.system_prompt.clone())
            .with_turn(ChatTurn::new(USER_ROLE, self.settings.summary_prompt.clone()));
        let summary = self.complete(request).context("summarizing conversation")?;

        let filename = derive_filename_with_extension(
            summary.content.trim(),
            session.messages(),
            &self.settings.extension,
        );
        let dir = if self.settings.current_directory {
            &self.working_dir
        } else {
            &self.settings.session_dir
        };
        Ok(dir.join(filename))
    }

    fn save(&mut self, session: &mut Session, path: &Path) -> Result<PathBuf> {
        let written = write_session(path, &session.render()).context("saving session")?;
        session.mark_saved().context("saving session")?;
        self.console
            .notice(&format!("Saved to {}", written.display()));
        self.ledger()
            .append(&written)
            .context("recording session history")?;
        Ok(written)
    }
}

fn to_turn(message: &Message) -> ChatTurn {
    ChatTurn::new(message.role(), message.content())
}
