//! Rendering of tool-call batches into the script format the code-executing
//! agent parses.
//!
//! The envelope is a fixed contract:
//!
//! ```text
//! Thought: I will execute the requested tool(s) and provide the final result.
//! Code:
//! ```py
//! connect_to_real_drone_result_call_1 = connect_to_real_drone(connection_string='udp:127.0.0.1:14550')
//! final_answer(connect_to_real_drone_result_call_1)
//! ```<end_code>
//! ```

use serde_json::Value;

use super::ToolCall;

const THOUGHT: &str = "I will execute the requested tool(s) and provide the final result.";
const FINAL_ANSWER: &str = "final_answer";

/// One `var = function(args)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statement {
    variable: String,
    call: String,
}

/// An ordered list of tool invocations terminated by a `final_answer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    statements: Vec<Statement>,
}

impl GeneratedScript {
    /// Build a script from tool calls. Returns `None` for an empty batch.
    pub fn from_tool_calls(calls: &[ToolCall]) -> Option<Self> {
        if calls.is_empty() {
            return None;
        }
        let statements = calls
            .iter()
            .map(|tc| {
                let args = tc
                    .arguments
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, python_literal(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                Statement {
                    variable: result_variable(&tc.function_name, &tc.id),
                    call: format!("{}({})", tc.function_name, args),
                }
            })
            .collect();
        Some(Self { statements })
    }

    /// Variable holding the last tool result, passed to `final_answer`.
    pub fn final_variable(&self) -> &str {
        // from_tool_calls never builds an empty script
        self.statements
            .last()
            .map(|s| s.variable.as_str())
            .unwrap_or_default()
    }

    /// The bare code lines, without the envelope.
    pub fn code(&self) -> String {
        let mut lines: Vec<String> = self
            .statements
            .iter()
            .map(|s| format!("{} = {}", s.variable, s.call))
            .collect();
        lines.push(format!("{}({})", FINAL_ANSWER, self.final_variable()));
        lines.join("\n")
    }

    /// The full Thought/Code envelope.
    pub fn render(&self) -> String {
        format!(
            "Thought: {}\nCode:\n```py\n{}\n```<end_code>",
            THOUGHT,
            self.code()
        )
    }
}

/// Name of the variable bound to a tool call's result.
pub fn result_variable(function_name: &str, call_id: &str) -> String {
    format!("{}_result_{}", function_name, call_id.replace('-', "_"))
}

/// Render a JSON value as a Python literal.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => python_str(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(python_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", python_str(k), python_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Quote a string the way Python's `repr` does.
fn python_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
