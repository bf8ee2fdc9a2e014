//! Per-connection protocol state machine
//!
//! A [`Session`] owns the transient state of one client: the current
//! phase, the username supplied so far, the line-assembly buffer, the
//! failed password attempt counter, and a pending password candidate
//! during a change. It performs no I/O of its own; the server feeds it
//! raw bytes with [`Session::push_bytes`] and executes each [`Action`]
//! returned by [`Session::advance`] against the socket.
//!
//! One advance step consumes at most one complete line, so a connection
//! is never processed past the data it has actually sent.

use zeroize::Zeroizing;

use crate::error::Result;
use crate::line::LineBuffer;
use crate::store::PasswdStore;

/// Number of consecutive failed password attempts tolerated per login
const MAX_PASSWORD_ATTEMPTS: u8 = 2;

/// Banner written to every admitted connection
pub const WELCOME: &str = "Welcome to the Wicket Server!\n";

/// Prompt for the username phase
pub const PROMPT_USERNAME: &str = "Username: ";

/// Prompt for the password phase
pub const PROMPT_PASSWORD: &str = "Password: ";

/// Prompt for a new password during a change
pub const PROMPT_NEW_PASSWORD: &str = "New Password: ";

/// Prompt to confirm the new password
pub const PROMPT_CONFIRM_PASSWORD: &str = "Confirm Password: ";

/// The menu text block sent on login and on the `menu` command
pub const MENU_TEXT: &str = "Available choices: \n\
\x20 1). Provide weather report.\n\
\x20 2). Learn the secret of the universe.\n\
\x20 3). Play global thermonuclear war\n\
\x20 4). Do nothing.\n\
\x20 5). Sing. Sing a song. Make it simple, to last the whole day long.\n\n\
Other commands: \n\
\x20 Hello - self-explanatory\n\
\x20 Passwd - change your password\n\
\x20 Menu - display this menu\n\
\x20 Exit - disconnect.\n\n";

/// Protocol phase of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the username line
    #[default]
    AwaitingUsername,
    /// Username recognized, waiting for the password line
    AwaitingPassword,
    /// Authenticated, dispatching menu commands
    Menu,
    /// `passwd` issued, waiting for the new password
    AwaitingNewPassword,
    /// New password buffered, waiting for the confirmation line
    AwaitingPasswordConfirmation,
}

/// Noteworthy protocol events, surfaced so the server can audit them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A username with no credential record was submitted
    UnknownUsername { username: String },
    /// The second consecutive password failure for this login
    PasswordFailedTwice { username: String },
    /// Password verified
    LoginSucceeded { username: String },
}

/// Outcome of one advance step
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// No complete line is buffered yet; nothing to do
    NeedMoreData,
    /// Write `reply` and keep the connection open
    Send {
        reply: Vec<u8>,
        event: Option<SessionEvent>,
    },
    /// Write `reply`, then close the connection
    Disconnect {
        reply: Vec<u8>,
        event: Option<SessionEvent>,
    },
}

impl Action {
    fn send(reply: impl Into<Vec<u8>>) -> Self {
        Action::Send {
            reply: reply.into(),
            event: None,
        }
    }

    fn send_with(reply: impl Into<Vec<u8>>, event: SessionEvent) -> Self {
        Action::Send {
            reply: reply.into(),
            event: Some(event),
        }
    }

    fn disconnect(reply: impl Into<Vec<u8>>) -> Self {
        Action::Disconnect {
            reply: reply.into(),
            event: None,
        }
    }

    fn disconnect_with(reply: impl Into<Vec<u8>>, event: SessionEvent) -> Self {
        Action::Disconnect {
            reply: reply.into(),
            event: Some(event),
        }
    }
}

/// State machine for one connection
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    username: String,
    buffer: LineBuffer,
    failed_attempts: u8,
    pending_password: Option<Zeroizing<String>>,
}

impl Session {
    /// A fresh session in the username phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Current protocol phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Username supplied so far (empty until the username phase completes)
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Append raw bytes received from the transport
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buffer.push_bytes(bytes);
    }

    /// Consume at most one buffered line and advance the state machine.
    ///
    /// Store errors propagate to the caller; the connection that
    /// triggered them should be disconnected, but other connections are
    /// unaffected.
    pub fn advance(&mut self, store: &PasswdStore) -> Result<Action> {
        let Some(line) = self.buffer.next_line() else {
            return Ok(Action::NeedMoreData);
        };
        let line = String::from_utf8_lossy(&line).into_owned();

        match self.phase {
            Phase::AwaitingUsername => self.on_username(line, store),
            Phase::AwaitingPassword => self.on_password(line, store),
            Phase::Menu => Ok(self.on_command(line)),
            Phase::AwaitingNewPassword => Ok(self.on_new_password(line)),
            Phase::AwaitingPasswordConfirmation => self.on_confirmation(line, store),
        }
    }

    fn on_username(&mut self, line: String, store: &PasswdStore) -> Result<Action> {
        self.username = line;
        if !store.user_exists(&self.username)? {
            return Ok(Action::disconnect_with(
                "Username not recognized\n",
                SessionEvent::UnknownUsername {
                    username: self.username.clone(),
                },
            ));
        }

        self.failed_attempts = 0;
        self.phase = Phase::AwaitingPassword;
        Ok(Action::send(PROMPT_PASSWORD))
    }

    fn on_password(&mut self, line: String, store: &PasswdStore) -> Result<Action> {
        if store.verify_password(&self.username, &line)? {
            self.failed_attempts = 0;
            self.phase = Phase::Menu;
            return Ok(Action::send_with(
                "Log in successful\n",
                SessionEvent::LoginSucceeded {
                    username: self.username.clone(),
                },
            ));
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= MAX_PASSWORD_ATTEMPTS {
            return Ok(Action::disconnect_with(
                "Invalid Password\nToo many login attempts\n",
                SessionEvent::PasswordFailedTwice {
                    username: self.username.clone(),
                },
            ));
        }
        Ok(Action::send(format!("Invalid Password\n{PROMPT_PASSWORD}")))
    }

    fn on_command(&mut self, line: String) -> Action {
        let cmd = line.to_ascii_lowercase();
        match cmd.as_str() {
            "hello" => Action::send("Hello back!\n"),
            "menu" => Action::send(MENU_TEXT),
            "exit" => Action::disconnect("Disconnecting...goodbye!\n"),
            "passwd" => {
                self.phase = Phase::AwaitingNewPassword;
                Action::send(PROMPT_NEW_PASSWORD)
            }
            "1" => Action::send(
                "You want a prediction about the weather? You're asking the wrong Phil.\n\
                 I'm going to give you a prediction about this winter. It's going to be\n\
                 cold, it's going to be dark and it's going to last you for the rest of\n\
                 your lives!\n",
            ),
            "2" => Action::send("42\n"),
            "3" => Action::send("That seems like a terrible idea.\n"),
            "4" => Action::send(""),
            "5" => Action::send(
                "I'm singing, I'm in a computer and I'm siiiingiiiing! I'm in a\n\
                 computer and I'm siiiiiiinnnggiiinnggg!\n",
            ),
            _ => Action::send(format!("Unrecognized command: {cmd}\n")),
        }
    }

    fn on_new_password(&mut self, line: String) -> Action {
        self.pending_password = Some(Zeroizing::new(line));
        self.phase = Phase::AwaitingPasswordConfirmation;
        Action::send(PROMPT_CONFIRM_PASSWORD)
    }

    fn on_confirmation(&mut self, line: String, store: &PasswdStore) -> Result<Action> {
        let pending = self.pending_password.take();
        self.phase = Phase::Menu;

        match pending {
            Some(pending) if pending.as_str() == line => {
                if store.change_password(&self.username, &line)? {
                    Ok(Action::send("Password successfully changed\n"))
                } else {
                    // The record vanished between login and the change
                    Ok(Action::send("Password change error occured\n"))
                }
            }
            _ => Ok(Action::send("Passwords do not match\n")),
        }
    }
}
