//! Command-line encoding per shell kind

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::shell::ShellKind;

/// Render `command` as the single argument the shell expects
///
/// POSIX shells and cmd take the text verbatim; PowerShell gets
/// base64 of the UTF-16LE bytes so quoting never goes through the host
/// argument parser.
pub fn encode_command(kind: ShellKind, command: &str) -> String {
    match kind {
        ShellKind::PowerShell => encode_powershell(command),
        ShellKind::Posix | ShellKind::Cmd => command.to_string(),
    }
}

/// Base64 of the UTF-16LE encoding, as `-EncodedCommand` wants it
pub fn encode_powershell(command: &str) -> String {
    let bytes: Vec<u8> = command
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    STANDARD.encode(bytes)
}
