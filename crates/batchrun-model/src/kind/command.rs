use serde::{Deserialize, Serialize};

/// Command of a task, given either as one shell line or as an argument list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// A single command line, e.g. `"python train.py --lr 0.1"`.
    Line(String),
    /// Program and arguments, e.g. `["python", "train.py", "--lr", "0.1"]`.
    Args(Vec<String>),
}

impl Command {
    /// Canonical single-space-joined rendering.
    ///
    /// A line is re-tokenized on whitespace first, so `"a   b"` and `["a", "b"]` render identically.
    /// List items are joined verbatim.
    pub fn command_string(&self) -> String {
        match self {
            Command::Line(line) => line.split_whitespace().collect::<Vec<_>>().join(" "),
            Command::Args(args) => args.join(" "),
        }
    }

    /// Whitespace tokenization of [`Command::command_string`].
    pub fn command_list(&self) -> Vec<String> {
        self.command_string()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Command::Line(line) => line.trim().is_empty(),
            Command::Args(args) => args.iter().all(|a| a.trim().is_empty()),
        }
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Command::Line(s.to_string())
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Command::Line(s)
    }
}

impl From<Vec<String>> for Command {
    fn from(args: Vec<String>) -> Self {
        Command::Args(args)
    }
}

impl From<Vec<&str>> for Command {
    fn from(args: Vec<&str>) -> Self {
        Command::Args(args.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Command {
    fn from(args: [&str; N]) -> Self {
        Command::Args(args.into_iter().map(str::to_string).collect())
    }
}
