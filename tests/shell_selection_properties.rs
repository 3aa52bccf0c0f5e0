//! Property tests for shell classification and argument building

use proptest::prelude::*;
use runbound_mcp::{encode_command, ShellDetector, ShellInvocation, ShellKind};

fn directory() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z0-9_ .-]{1,12}", 0..4).prop_map(|parts| parts.join("/"))
}

proptest! {
    #[test]
    fn prop_powershell_detected_regardless_of_directory(
        dir in directory(),
        name in prop::sample::select(vec!["pwsh", "PWSH.EXE", "powershell", "PowerShell.exe"]),
        windows_separators in any::<bool>(),
    ) {
        let path = if dir.is_empty() { name.to_string() } else { format!("{dir}/{name}") };
        let path = if windows_separators { path.replace('/', "\\") } else { path };
        prop_assert_eq!(ShellKind::detect(&path), ShellKind::PowerShell);
    }

    #[test]
    fn prop_posix_command_passed_verbatim(command in "[^\\x00]{1,200}") {
        let spec = ShellInvocation::new("/bin/sh").spawn_spec(&command, None);
        prop_assert_eq!(spec.args.len(), 2);
        prop_assert_eq!(&spec.args[0], "-c");
        prop_assert_eq!(&spec.args[1], &command);
    }

    #[test]
    fn prop_powershell_argument_is_plain_base64(command in ".{0,200}") {
        let encoded = encode_command(ShellKind::PowerShell, &command);
        prop_assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
        // Two bytes per UTF-16 unit, four base64 chars per three bytes
        let units = command.encode_utf16().count();
        prop_assert_eq!(encoded.len(), (units * 2).div_ceil(3) * 4);
    }

    #[test]
    fn prop_blacklist_matches_basename_only(dir in directory()) {
        let fish = if dir.is_empty() { "fish".to_string() } else { format!("/{dir}/fish") };
        prop_assert!(ShellDetector::is_blacklisted(&fish));

        let fishy = format!("/{dir}/fishy");
        prop_assert!(!ShellDetector::is_blacklisted(&fishy));
    }
}
