use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            // Quote anything a shell would split
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"') {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// An item of the executor queue: work or a control sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop draining the queue
    Exit,
    /// No-op
    Skip,
    Run(Invocation),
}

impl Command {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Command::Exit | Command::Skip)
    }
}

impl From<Invocation> for Command {
    fn from(invocation: Invocation) -> Self {
        Command::Run(invocation)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Exit => f.write_str("exit"),
            Command::Skip => f.write_str("skip"),
            Command::Run(invocation) => invocation.fmt(f),
        }
    }
}

/// Parses `exit` / `skip` as sentinels; anything else is split on whitespace
/// into a program and its arguments.
impl FromStr for Command {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "exit" => Ok(Command::Exit),
            "skip" | "" => Ok(Command::Skip),
            _ => {
                let mut parts = s.split_whitespace();
                let program = parts.next().unwrap_or_default();
                Ok(Command::Run(Invocation {
                    program: program.to_string(),
                    args: parts.map(str::to_string).collect(),
                }))
            }
        }
    }
}
