//! kpt argument vector assembly.

use std::path::Path;

/// Assemble a kpt invocation's argument list.
///
/// Tokens are concatenated in a strict order that determines the external
/// tool's semantics: sub-command tokens, then the target path (omitted when
/// `None`), then flags, then global flags. Tokens are taken as-is; callers
/// supply them pre-split.
pub fn kpt_command_args(
  dir: Option<&Path>,
  commands: &[&str],
  flags: &[String],
  global_flags: &[String],
) -> Vec<String> {
  let mut args = Vec::with_capacity(commands.len() + 1 + flags.len() + global_flags.len());

  args.extend(commands.iter().map(|c| c.to_string()));

  if let Some(dir) = dir {
    args.push(dir.display().to_string());
  }

  args.extend(flags.iter().cloned());
  args.extend(global_flags.iter().cloned());

  args
}
