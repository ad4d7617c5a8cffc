//! Rendering diagnostics for humans and machines.

use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use mesh_analysis::{Diagnostic, Level};
use nu_ansi_term::{Color, Style};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
	#[error("writing output")]
	Write(#[from] std::io::Error),

	#[error("encoding json output")]
	Json(#[from] serde_json::Error),

	#[error("encoding yaml output")]
	Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	/// One line per diagnostic
	#[default]
	Log,
	Json,
	Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
	/// Color when stdout is a terminal and NO_COLOR is unset
	#[default]
	Auto,
	Always,
	Never,
}

impl ColorMode {
	pub fn should_colorize(self) -> bool {
		match self {
			ColorMode::Always => true,
			ColorMode::Never => false,
			ColorMode::Auto => {
				std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
			}
		}
	}
}

fn level_style(level: Level) -> Style {
	match level {
		Level::Info => Color::Cyan.normal(),
		Level::Warning => Color::Yellow.bold(),
		Level::Error => Color::Red.bold(),
	}
}

/// Writes diagnostics in the selected format.
pub struct Printer<W> {
	writer: W,
	format: OutputFormat,
	colorize: bool,
}

impl<W: Write> Printer<W> {
	pub fn new(writer: W, format: OutputFormat, color: ColorMode) -> Self {
		Self {
			writer,
			format,
			colorize: color.should_colorize(),
		}
	}

	/// `target` names what was analyzed, it only shows up in the log format
	/// when there is nothing to report.
	pub fn print(&mut self, diagnostics: &[Diagnostic], target: &str) -> Result<(), OutputError> {
		match self.format {
			OutputFormat::Log => self.print_log(diagnostics, target)?,
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut self.writer, diagnostics)?;
				writeln!(self.writer)?;
			}
			OutputFormat::Yaml => serde_yaml::to_writer(&mut self.writer, diagnostics)?,
		}
		self.writer.flush()?;
		Ok(())
	}

	fn print_log(&mut self, diagnostics: &[Diagnostic], target: &str) -> Result<(), OutputError> {
		if diagnostics.is_empty() {
			let line = format!("✔ No validation issues found when analyzing {target}.");
			if self.colorize {
				writeln!(self.writer, "{}", Color::Green.paint(line))?;
			} else {
				writeln!(self.writer, "{line}")?;
			}
			return Ok(());
		}

		for diagnostic in diagnostics {
			let level = diagnostic.level();
			if self.colorize {
				write!(self.writer, "{}", level_style(level).paint(level.as_str()))?;
			} else {
				write!(self.writer, "{level}")?;
			}
			write!(
				self.writer,
				" [{}] ({}",
				diagnostic.code(),
				diagnostic.reference()
			)?;
			if let Some(origin) = &diagnostic.origin {
				write!(self.writer, " {origin}")?;
			}
			writeln!(self.writer, ") {}", diagnostic.message)?;
		}
		Ok(())
	}
}
