// response parsing - turns model output into a commit subject and body

use std::fmt;

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

/// a commit message split the way `git commit -m <subject> -m <body>` wants it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBody {
    Text(String),
    Lines(Vec<String>),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default, alias = "title")]
    subject: Option<String>,
    #[serde(default)]
    body: Option<RawBody>,
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").unwrap();
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

impl CommitMessage {
    /// first non-empty line is the subject, everything after it is the body
    pub fn from_plain_text(text: &str) -> Self {
        let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
        let subject = lines.next().unwrap_or_default().trim().to_string();
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        Self { subject, body }
    }

    /// arguments for `git commit`
    pub fn to_git_args(&self) -> Vec<String> {
        let mut args = vec!["-m".to_string(), self.subject.clone()];
        if !self.body.is_empty() {
            args.push("-m".to_string());
            args.push(self.body.clone());
        }
        args
    }

    fn normalized(self) -> Self {
        let subject = self
            .subject
            .trim()
            .trim_matches(|c: char| c == '"' || c == '`')
            .trim();
        // a multi-line subject spills into the body
        let (subject, spill) = match subject.split_once('\n') {
            Some((first, rest)) => (first.trim(), rest.trim()),
            None => (subject, ""),
        };
        let body = match (spill.is_empty(), self.body.trim().is_empty()) {
            (true, _) => self.body.trim().to_string(),
            (false, true) => spill.to_string(),
            (false, false) => format!("{spill}\n\n{}", self.body.trim()),
        };
        Self {
            subject: subject.to_string(),
            body,
        }
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.subject)
        } else {
            write!(f, "{}\n\n{}", self.subject, self.body)
        }
    }
}

/// parse `{"subject": ..., "body": ...}`, tolerating code fences and surrounding chatter
pub fn parse_commit_message(raw: &str) -> Result<CommitMessage> {
    let text = strip_code_fence(raw.trim());

    let parsed = JSON_OBJECT
        .find(text)
        .and_then(|m| serde_json::from_str::<RawMessage>(m.as_str()).ok())
        .and_then(|msg| {
            let subject = msg.subject?;
            let body = match msg.body {
                Some(RawBody::Text(text)) => text,
                Some(RawBody::Lines(lines)) => lines.join("\n"),
                None => String::new(),
            };
            Some(CommitMessage { subject, body })
        });

    let message = parsed
        .unwrap_or_else(|| CommitMessage::from_plain_text(text))
        .normalized();

    if message.subject.is_empty() {
        return Err(anyhow::anyhow!("model returned an empty commit subject"));
    }
    Ok(message)
}

fn strip_code_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text)
}
