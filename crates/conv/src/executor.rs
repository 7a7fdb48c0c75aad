use std::future::Future;
use std::io::Write;
use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use crate::command::{Command, Invocation};
use crate::error::{ConvError, ConvResult};

/// Create a FIFO command queue: the sending half for producers and the
/// receiving half for a single `Executor`.
pub fn command_queue() -> (CommandSender, UnboundedReceiver<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, rx)
}

/// Producer handle for the command queue
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: UnboundedSender<Command>,
}

impl CommandSender {
    pub fn enqueue(&self, command: Command) -> ConvResult<()> {
        debug!("enqueue: {}", command);
        self.tx.send(command).map_err(|_| ConvError::QueueClosed)
    }
}

/// What happens to a runnable command once dequeued
pub trait Dispatcher {
    fn dispatch(&mut self, invocation: Invocation) -> impl Future<Output = ConvResult<()>>;
}

/// Debug-mode dispatcher: writes `exec: <command>` lines instead of running anything
#[derive(Debug)]
pub struct PrintDispatcher<W> {
    out: W,
}

impl PrintDispatcher<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: std::io::stdout() }
    }
}

impl<W: Write> PrintDispatcher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Dispatcher for PrintDispatcher<W> {
    async fn dispatch(&mut self, invocation: Invocation) -> ConvResult<()> {
        if let Err(e) = writeln!(self.out, "exec: {}", invocation) {
            warn!("failed to print command {}: {}", invocation, e);
        }
        Ok(())
    }
}

/// Production dispatcher: replaces the current process with the command.
///
/// This never returns on success, so only the first runnable command of a run
/// is ever executed; whatever is still queued behind it is abandoned.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplaceDispatcher;

impl Dispatcher for ReplaceDispatcher {
    async fn dispatch(&mut self, invocation: Invocation) -> ConvResult<()> {
        info!("exec: {}", invocation);
        let program = invocation.program.clone();
        let err = tokio::task::spawn_blocking(move || exec_and_replace(&invocation))
            .await
            .map_err(|e| ConvError::Exec {
                program,
                source: std::io::Error::other(e.to_string()),
            })?;
        Err(err)
    }
}

/// Replace the current process image with `invocation`.
///
/// Only comes back if the exec itself failed.
#[cfg(unix)]
pub fn exec_and_replace(invocation: &Invocation) -> ConvError {
    use std::os::unix::process::CommandExt;

    let source = std::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .exec();
    ConvError::Exec {
        program: invocation.program.clone(),
        source,
    }
}

#[cfg(not(unix))]
pub fn exec_and_replace(invocation: &Invocation) -> ConvError {
    ConvError::Exec {
        program: invocation.program.clone(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process replacement requires a unix target",
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Waiting,
    Executing,
    Terminated,
}

/// Single consumer draining the command queue in FIFO order
#[derive(Debug)]
pub struct Executor<'d, D> {
    rx: UnboundedReceiver<Command>,
    dispatcher: &'d mut D,
    state: ExecutorState,
    dispatched: usize,
}

impl<'d, D: Dispatcher> Executor<'d, D> {
    pub fn new(rx: UnboundedReceiver<Command>, dispatcher: &'d mut D) -> Self {
        Self {
            rx,
            dispatcher,
            state: ExecutorState::Waiting,
            dispatched: 0,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Runnable commands handed to the dispatcher so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Drain the queue until `exit` is dequeued or every sender is gone.
    ///
    /// Nothing behind `exit` is dequeued. Returns the number of commands
    /// dispatched.
    pub async fn run(&mut self) -> ConvResult<usize> {
        while self.state == ExecutorState::Waiting {
            let Some(command) = self.rx.recv().await else {
                debug!("command queue closed");
                self.state = ExecutorState::Terminated;
                break;
            };

            match command {
                Command::Exit => {
                    debug!("exit dequeued");
                    self.state = ExecutorState::Terminated;
                }
                Command::Skip => {}
                Command::Run(invocation) => {
                    self.state = ExecutorState::Executing;
                    self.dispatched += 1;
                    let result = self.dispatcher.dispatch(invocation).await;
                    if let Err(e) = result {
                        self.state = ExecutorState::Terminated;
                        return Err(e);
                    }
                    self.state = ExecutorState::Waiting;
                }
            }
        }
        Ok(self.dispatched)
    }

    /// Hand back the receiver, e.g. to inspect what was left undrained
    pub fn into_receiver(self) -> UnboundedReceiver<Command> {
        self.rx
    }
}
