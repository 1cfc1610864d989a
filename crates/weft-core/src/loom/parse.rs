//! Loom reader: text -> loosely-typed payload.
//!
//! The parser never panics and never throws: malformed constructs are
//! reported as field-level errors while parsing continues, so one bad line
//! does not hide the rest of the document. The payload is deliberately
//! loose (`serde_json::Value`); `crate::convert` turns it into a `Plan`.

use serde_json::{json, Map, Value};

use weft_types::error::FieldError;

/// Result of parsing a Loom document.
#[derive(Debug)]
pub struct ParseOutcome {
    /// True when the document parsed without a single field error.
    pub success: bool,
    /// The parsed payload; present whenever a `@plan` header was found.
    pub data: Option<Value>,
    pub errors: Vec<FieldError>,
}

/// Parse Loom text into a loosely-typed payload.
///
/// The input must already be fence-stripped. Lines before `@plan` and after
/// `@end` are ignored (LLMs like to add prose); everything in between must
/// be a known construct.
pub fn parse_plan(text: &str) -> ParseOutcome {
    let mut p = Parser::default();

    for line in text.lines() {
        if !p.seen_plan {
            if line.trim() == "@plan" {
                p.seen_plan = true;
            }
            continue;
        }
        if line.trim() == "@end" {
            break;
        }
        p.line(line);
    }

    if !p.seen_plan {
        return ParseOutcome {
            success: false,
            data: None,
            errors: vec![FieldError::new(
                "document",
                "missing @plan header",
                "start the document with a line containing only '@plan'",
            )],
        };
    }

    let data = p.into_payload();
    ParseOutcome {
        success: data.1.is_empty(),
        data: Some(data.0),
        errors: data.1,
    }
}

#[derive(Default, Clone, Copy, PartialEq)]
enum CredSection {
    #[default]
    None,
    Needed,
    Available,
}

#[derive(Default)]
struct Parser {
    seen_plan: bool,
    title: Option<String>,
    summary: Option<String>,
    cred_section: CredSection,
    creds_needed: Vec<Value>,
    creds_available: Vec<Value>,
    workflow_seen: bool,
    workflow_name: String,
    workflow_active: bool,
    nodes: Vec<Value>,
    /// (source, port, target, index) tuples, assembled into the map at the end.
    edges: Vec<(String, usize, String, u32)>,
    settings: Map<String, Value>,
    errors: Vec<FieldError>,
}

impl Parser {
    fn line(&mut self, raw: &str) {
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return;
        }

        if let Some(rest) = trimmed.strip_prefix("title:") {
            self.title = Some(unescape(rest.trim()));
        } else if let Some(rest) = trimmed.strip_prefix("summary:") {
            self.summary = Some(unescape(rest.trim()));
        } else if trimmed == "@credentials needed" {
            self.cred_section = CredSection::Needed;
        } else if trimmed == "@credentials available" {
            self.cred_section = CredSection::Available;
        } else if let Some(rest) = trimmed.strip_prefix("- ") {
            self.credential_entry(rest);
        } else if let Some(rest) = trimmed.strip_prefix("@workflow ") {
            self.workflow_header(rest);
        } else if let Some(rest) = trimmed.strip_prefix("@node ") {
            self.node_header(rest);
        } else if let Some(rest) = trimmed.strip_prefix("param ") {
            self.node_entry("parameters", rest);
        } else if let Some(rest) = trimmed.strip_prefix("cred ") {
            self.node_entry("credentials", rest);
        } else if let Some(rest) = trimmed.strip_prefix("@connect ") {
            self.connect(rest);
        } else if let Some(rest) = trimmed.strip_prefix("@settings ") {
            self.setting(rest);
        } else {
            self.errors.push(FieldError::new(
                "document",
                format!("unrecognized line: '{trimmed}'"),
                "use only @plan/@credentials/@workflow/@node/@connect/@settings/@end constructs",
            ));
        }
    }

    fn credential_entry(&mut self, rest: &str) {
        let list = match self.cred_section {
            CredSection::Needed => &mut self.creds_needed,
            CredSection::Available => &mut self.creds_available,
            CredSection::None => {
                self.errors.push(FieldError::new(
                    "credentials",
                    "credential entry outside a @credentials section",
                    "put '- kind=...' lines under '@credentials needed' or '@credentials available'",
                ));
                return;
            }
        };

        let mut entry = Map::new();
        for pair in split_unescaped(rest, ';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                self.errors.push(FieldError::new(
                    "credentials",
                    format!("malformed credential field: '{pair}'"),
                    "write credential fields as key=value pairs separated by ';'",
                ));
                continue;
            };
            let value = unescape(value.trim());
            match key.trim() {
                "kind" => entry.insert("type".to_string(), Value::String(value)),
                "name" => entry.insert("name".to_string(), Value::String(value)),
                "for" => entry.insert("required_for".to_string(), Value::String(value)),
                "node_id" => entry.insert("node_id".to_string(), Value::String(value)),
                "node_name" => entry.insert("node_name".to_string(), Value::String(value)),
                // Unknown keys are dropped, not fatal.
                _ => None,
            };
        }
        list.push(Value::Object(entry));
    }

    fn workflow_header(&mut self, rest: &str) {
        self.workflow_seen = true;
        match rest.rsplit_once(" | ") {
            Some((name, tail)) if tail.starts_with("active=") => {
                self.workflow_name = unescape(name.trim());
                self.workflow_active = tail == "active=true";
            }
            _ => {
                self.workflow_name = unescape(rest.trim());
                self.workflow_active = false;
            }
        }
    }

    fn node_header(&mut self, rest: &str) {
        let field = format!("nodes[{}]", self.nodes.len());
        let segments: Vec<&str> = rest.split(" | ").collect();
        if segments.len() != 5 {
            self.errors.push(FieldError::new(
                &field,
                format!("expected 5 '|'-separated segments, found {}", segments.len()),
                "write nodes as '@node <id> | <name> | <type> | v<version> | (x,y)'",
            ));
            return;
        }

        let version = segments[3]
            .strip_prefix('v')
            .and_then(|v| v.parse::<f64>().ok());
        if version.is_none() {
            self.errors.push(FieldError::new(
                format!("{field}.typeVersion"),
                format!("unparsable version segment: '{}'", segments[3]),
                "write the version as 'v<number>', e.g. v1 or v2.1",
            ));
        }

        let position = parse_position(segments[4]);
        if position.is_none() {
            self.errors.push(FieldError::new(
                format!("{field}.position"),
                format!("unparsable position segment: '{}'", segments[4]),
                "write the position as '(x,y)' with two numbers",
            ));
        }
        let position = position.unwrap_or([0.0, 0.0]);

        let mut node = Map::new();
        node.insert("id".to_string(), Value::String(unescape(segments[0].trim())));
        node.insert("name".to_string(), Value::String(unescape(segments[1].trim())));
        node.insert("type".to_string(), Value::String(unescape(segments[2].trim())));
        node.insert("typeVersion".to_string(), json!(version.unwrap_or(1.0)));
        node.insert("position".to_string(), json!([position[0], position[1]]));
        node.insert("parameters".to_string(), Value::Object(Map::new()));
        self.nodes.push(Value::Object(node));
    }

    fn node_entry(&mut self, section: &str, rest: &str) {
        let index = self.nodes.len();
        let Some(node) = self.nodes.last_mut().and_then(Value::as_object_mut) else {
            self.errors.push(FieldError::new(
                "nodes",
                format!("'{}' entry before any @node line", section),
                "put param/cred lines directly under their @node line",
            ));
            return;
        };

        let Some((key, value)) = rest.split_once(" = ") else {
            self.errors.push(FieldError::new(
                format!("nodes[{}].{}", index - 1, section),
                format!("malformed entry: '{rest}'"),
                "write entries as '<key> = <json value>'",
            ));
            return;
        };

        // Unparsable JSON degrades to a plain string; the model often
        // forgets quotes around simple values.
        let value: Value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| Value::String(value.trim().to_string()));

        node.entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("section is always an object")
            .insert(key.trim().to_string(), value);
    }

    fn connect(&mut self, rest: &str) {
        let field = format!("connections[{}]", self.edges.len());
        let parsed = (|| {
            let (left, right) = rest.split_once(" -> ")?;
            let (source, port) = left.rsplit_once(" #")?;
            let (target, index) = right.rsplit_once(" @")?;
            let port: usize = port.trim().parse().ok()?;
            let index: u32 = index.trim().parse().ok()?;
            Some((unescape(source.trim()), port, unescape(target.trim()), index))
        })();

        match parsed {
            Some(edge) => self.edges.push(edge),
            None => self.errors.push(FieldError::new(
                field,
                format!("malformed connection: '{rest}'"),
                "write connections as '@connect <source> #<port> -> <target> @<index>'",
            )),
        }
    }

    fn setting(&mut self, rest: &str) {
        let Some((key, value)) = rest.split_once(" = ") else {
            self.errors.push(FieldError::new(
                "settings",
                format!("malformed setting: '{rest}'"),
                "write settings as '@settings <key> = <json value>'",
            ));
            return;
        };
        let value: Value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| Value::String(value.trim().to_string()));
        self.settings.insert(key.trim().to_string(), value);
    }

    fn into_payload(self) -> (Value, Vec<FieldError>) {
        let mut payload = Map::new();
        if let Some(title) = self.title {
            payload.insert("title".to_string(), Value::String(title));
        }
        if let Some(summary) = self.summary {
            payload.insert("summary".to_string(), Value::String(summary));
        }
        payload.insert("credentials_needed".to_string(), Value::Array(self.creds_needed));
        payload.insert(
            "credentials_available".to_string(),
            Value::Array(self.creds_available),
        );

        if self.workflow_seen {
            let mut connections = Map::new();
            for (source, port, target, index) in self.edges {
                let ports = connections
                    .entry(source)
                    .or_insert_with(|| json!({"main": []}));
                let main = ports["main"].as_array_mut().expect("main is always an array");
                while main.len() <= port {
                    main.push(Value::Array(Vec::new()));
                }
                main[port]
                    .as_array_mut()
                    .expect("port is always an array")
                    .push(json!({"node": target, "type": "main", "index": index}));
            }

            payload.insert(
                "workflow".to_string(),
                json!({
                    "name": self.workflow_name,
                    "active": self.workflow_active,
                    "nodes": self.nodes,
                    "connections": connections,
                    "settings": self.settings,
                }),
            );
        }

        (Value::Object(payload), self.errors)
    }
}

fn parse_position(segment: &str) -> Option<[f64; 2]> {
    let inner = segment.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;
    Some([x.trim().parse().ok()?, y.trim().parse().ok()?])
}

/// Split on `separator`, honoring backslash escapes.
fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Reverse of the writer's escaping: `\\n` -> newline, `\\\\` -> backslash,
/// `\\;` -> `;`, `\\|` -> `|`.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(';') => out.push(';'),
            Some('|') => out.push('|'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
