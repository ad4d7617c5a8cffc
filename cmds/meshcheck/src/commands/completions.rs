//! Completions command handler.

use std::io::Write;

use anyhow::Result;
use clap::{Args, Command};
use clap_complete::Shell;

#[derive(Args, Debug)]
pub struct CompletionsArgs {
	/// Shell to generate completions for
	#[arg(value_enum)]
	pub shell: Shell,
}

/// Print completions for `cmd` to `writer`.
pub fn run<W: Write>(args: CompletionsArgs, cmd: &mut Command, mut writer: W) -> Result<()> {
	let name = cmd.get_name().to_owned();
	clap_complete::generate(args.shell, cmd, name, &mut writer);
	writer.flush()?;
	Ok(())
}
