//! Edit script format.
//!
//! One command per line; blank lines and lines starting with `#` are skipped.
//! Text arguments run to the end of the line and understand `\n`, `\t`, `\s`
//! (space) and `\\`.
//!
//! ```text
//! cursor 5
//! type .
//! wait 1200
//! complete
//! select 0
//! ```

use std::time::Duration;

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Insert text at a char offset.
	Insert { at: usize, text: String },
	/// Delete chars at a char offset.
	Delete { at: usize, count: usize },
	/// Move the cursor.
	Cursor(usize),
	/// Insert text at the cursor.
	Type(String),
	/// Delete the char before the cursor.
	Backspace,
	/// Press the manual completion chord.
	Complete,
	/// Accept the n-th visible completion item.
	Select(usize),
	/// Dismiss the completion popover.
	Escape,
	/// Write the buffer to disk.
	Save,
	/// Let time pass.
	Wait(Duration),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
	pub line: usize,
	pub message: String,
}

pub fn parse_script(source: &str) -> Result<Vec<Command>, ScriptError> {
	source
		.lines()
		.enumerate()
		.filter(|(_, line)| {
			let trimmed = line.trim();
			!trimmed.is_empty() && !trimmed.starts_with('#')
		})
		.map(|(idx, line)| parse_line(line.trim_start()).map_err(|message| ScriptError { line: idx + 1, message }))
		.collect()
}

fn parse_line(line: &str) -> Result<Command, String> {
	let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
	match word {
		"insert" => {
			let (at, text) = rest.split_once(' ').ok_or("insert needs <offset> <text>")?;
			Ok(Command::Insert {
				at: number(at)?,
				text: unescape(text)?,
			})
		}
		"delete" => {
			let (at, count) = rest.split_once(' ').ok_or("delete needs <offset> <count>")?;
			Ok(Command::Delete {
				at: number(at)?,
				count: number(count.trim())?,
			})
		}
		"cursor" => Ok(Command::Cursor(number(rest.trim())?)),
		"type" => {
			let text = unescape(rest)?;
			if text.is_empty() {
				return Err("type needs <text>".into());
			}
			Ok(Command::Type(text))
		}
		"backspace" => Ok(Command::Backspace),
		"complete" => Ok(Command::Complete),
		"select" => Ok(Command::Select(number(rest.trim())?)),
		"escape" => Ok(Command::Escape),
		"save" => Ok(Command::Save),
		"wait" => Ok(Command::Wait(Duration::from_millis(number(rest.trim())? as u64))),
		other => Err(format!("unknown command `{other}`")),
	}
}

fn number(s: &str) -> Result<usize, String> {
	s.parse().map_err(|_| format!("expected a number, got `{s}`"))
}

fn unescape(s: &str) -> Result<String, String> {
	let mut out = String::with_capacity(s.len());
	let mut chars = s.chars();
	while let Some(ch) = chars.next() {
		if ch != '\\' {
			out.push(ch);
			continue;
		}
		match chars.next() {
			Some('n') => out.push('\n'),
			Some('t') => out.push('\t'),
			Some('s') => out.push(' '),
			Some('\\') => out.push('\\'),
			Some(other) => return Err(format!("unknown escape `\\{other}`")),
			None => return Err("trailing backslash".into()),
		}
	}
	Ok(out)
}
