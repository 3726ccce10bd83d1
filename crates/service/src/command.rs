//! Typed commands decoded from command-channel requests.

use edgekb_bus::CommandRequest;
use edgekb_core::Measurement;
use serde_json::Value;

use crate::error::CommandError;

/// A validated command, ready for the engine queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Append science rules to a goal.
    Rule { goal_id: String, rules: Vec<String> },
    /// Register `condition ==> fact` triggers for a goal.
    Trigger { goal_id: String, expressions: Vec<String> },
    /// Forget a goal's rules and triggers.
    Dump { goal_id: String },
    /// Query a goal without changing any state.
    Ask { goal_id: String, predicate: String },
    /// Store a reading and re-evaluate triggered goals.
    Measure(Measurement),
    Ping,
    Terminate,
}

impl Command {
    /// Decode and validate a request. Unknown kinds and malformed
    /// arguments are rejected here.
    pub fn decode(request: &CommandRequest) -> Result<Self, CommandError> {
        let args = &request.args;
        match request.command.as_str() {
            "ping" => Ok(Command::Ping),
            "terminate" => Ok(Command::Terminate),
            "rule" => {
                let (goal_id, rules) = goal_and_texts("rule", args)?;
                Ok(Command::Rule { goal_id, rules })
            }
            "trigger" | "expr" | "state" => {
                let (goal_id, expressions) = goal_and_texts("trigger", args)?;
                Ok(Command::Trigger { goal_id, expressions })
            }
            "dump" => match args.as_slice() {
                [goal] => Ok(Command::Dump { goal_id: goal_id(goal)? }),
                _ => Err(arity("dump", "<goal_id>")),
            },
            "ask" => match args.as_slice() {
                [goal, predicate] => Ok(Command::Ask {
                    goal_id: goal_id(goal)?,
                    predicate: text("ask", predicate)?,
                }),
                _ => Err(arity("ask", "<goal_id> <predicate>")),
            },
            "measure" => match args.as_slice() {
                [name, timestamp, value] => Ok(Command::Measure(Measurement::from_json_parts(
                    name, timestamp, value,
                )?)),
                _ => Err(arity("measure", "<name> <timestamp> <value>")),
            },
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Rule { .. } => "rule",
            Command::Trigger { .. } => "trigger",
            Command::Dump { .. } => "dump",
            Command::Ask { .. } => "ask",
            Command::Measure(_) => "measure",
            Command::Ping => "ping",
            Command::Terminate => "terminate",
        }
    }
}

fn arity(command: &str, usage: &str) -> CommandError {
    CommandError::Validation(format!("usage: {command} {usage}"))
}

fn goal_id(v: &Value) -> Result<String, CommandError> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        other => Err(CommandError::Validation(format!(
            "goal id must be a non-empty string, got {other}"
        ))),
    }
}

fn text(command: &str, v: &Value) -> Result<String, CommandError> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        other => Err(CommandError::Validation(format!(
            "{command}: expected a non-empty string argument, got {other}"
        ))),
    }
}

fn goal_and_texts(command: &str, args: &[Value]) -> Result<(String, Vec<String>), CommandError> {
    match args {
        [goal, rest @ ..] if !rest.is_empty() => {
            let texts = rest
                .iter()
                .map(|v| text(command, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((goal_id(goal)?, texts))
        }
        _ => Err(arity(command, "<goal_id> <text>...")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(command: &str, args: Value) -> Result<Command, CommandError> {
        let args = args.as_array().cloned().unwrap_or_default();
        Command::decode(&CommandRequest::new(command, args))
    }

    #[test]
    fn decodes_rule() {
        let cmd = decode("rule", json!(["g1", "Daytime(Now) ==> Run(Cloud)"])).unwrap();
        assert_eq!(
            cmd,
            Command::Rule {
                goal_id: "g1".into(),
                rules: vec!["Daytime(Now) ==> Run(Cloud)".into()],
            }
        );
    }

    #[test]
    fn trigger_aliases() {
        for kind in ["trigger", "expr", "state"] {
            let cmd = decode(kind, json!(["g1", "hour > 10 ==> Daytime(Now)"])).unwrap();
            assert_eq!(cmd.kind(), "trigger");
        }
    }

    #[test]
    fn decodes_measure_with_string_numbers() {
        let cmd = decode("measure", json!(["env.system.time", "1700000000", "11"])).unwrap();
        match cmd {
            Command::Measure(m) => {
                assert_eq!(m.name, "env.system.time");
                assert_eq!(m.value, 11.0);
            }
            other => panic!("expected measure, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_measure() {
        assert!(matches!(
            decode("measure", json!(["hour", 1, "eleven"])),
            Err(CommandError::Core(_))
        ));
    }

    #[test]
    fn unknown_command() {
        assert!(matches!(
            decode("launch", json!([])),
            Err(CommandError::UnknownCommand(k)) if k == "launch"
        ));
    }

    #[test]
    fn arity_and_type_errors() {
        for (kind, args) in [
            ("rule", json!(["g1"])),
            ("rule", json!([])),
            ("rule", json!(["g1", 3])),
            ("dump", json!([])),
            ("dump", json!([""])),
            ("ask", json!(["g1"])),
            ("measure", json!(["hour", 1])),
        ] {
            assert!(matches!(decode(kind, args.clone()), Err(CommandError::Validation(_))), "{kind} {args}");
        }
    }

    #[test]
    fn ping_ignores_args() {
        assert_eq!(decode("ping", json!(["x"])).unwrap(), Command::Ping);
    }
}
