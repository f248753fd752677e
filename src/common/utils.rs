//! Small shared helpers: duration formatting, path privacy, shell quoting
//! and process probing.

use std::path::Path;
use std::time::Duration;

/// Format a duration for human-readable log lines (`7h12m`, `4m`, `12s`).
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h{minutes}m")
        } else {
            format!("{hours}h")
        }
    } else if minutes > 0 {
        if seconds > 0 {
            format!("{minutes}m{seconds}s")
        } else {
            format!("{minutes}m")
        }
    } else {
        format!("{seconds}s")
    }
}

/// Format a signed chrono duration, keeping the sign visible.
pub fn format_signed_duration(duration: chrono::Duration) -> String {
    let magnitude = duration.abs().to_std().unwrap_or_default();
    if duration < chrono::Duration::zero() {
        format!("-{}", format_duration(magnitude))
    } else {
        format_duration(magnitude)
    }
}

/// Replace the home directory prefix with `~` so logs don't leak usernames.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }
    path.display().to_string()
}

/// Quote a string for safe use as one word in a POSIX shell command line.
///
/// Remote commands go through the remote user's login shell, so every path
/// interpolated into them must be quoted.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a remote path, leaving a leading `~/` for the remote shell to expand.
///
/// `scp host:~/dir` resolves the tilde to the remote home, so `test -d` and
/// `mkdir -p` must see the same directory.
pub fn shell_quote_path(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_quote(rest)),
        None if path == "~" => path.to_string(),
        None => shell_quote(path),
    }
}

/// Check whether a process with the given PID is alive.
pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 performs the permission and existence checks without delivering anything.
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(12)), "12s");
        assert_eq!(format_duration(Duration::from_secs(240)), "4m");
        assert_eq!(format_duration(Duration::from_secs(250)), "4m10s");
        assert_eq!(format_duration(Duration::from_secs(7 * 3600)), "7h");
        assert_eq!(format_duration(Duration::from_secs(7 * 3600 + 720)), "7h12m");
    }

    #[test]
    fn test_format_signed_duration() {
        assert_eq!(format_signed_duration(chrono::Duration::hours(-9)), "-9h");
        assert_eq!(format_signed_duration(chrono::Duration::minutes(90)), "1h30m");
    }

    #[test]
    fn test_shell_quote_plain_words_pass_through() {
        assert_eq!(shell_quote("/srv/lapse/2024-06-01"), "/srv/lapse/2024-06-01");
        assert_eq!(shell_quote("pi@camera.local"), "pi@camera.local");
    }

    #[test]
    fn test_shell_quote_escapes_spaces_and_quotes() {
        assert_eq!(shell_quote("/Users/k/My Lapse"), "'/Users/k/My Lapse'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_shell_quote_path_keeps_home_prefix_unquoted() {
        assert_eq!(shell_quote_path("~/lapse/2024-06-01"), "~/lapse/2024-06-01");
        assert_eq!(shell_quote_path("~/My Lapse"), "~/'My Lapse'");
        assert_eq!(shell_quote_path("~"), "~");
        assert_eq!(shell_quote_path("/srv/~x"), "'/srv/~x'");
        assert_eq!(shell_quote_path("~other/lapse"), "'~other/lapse'");
    }

    #[test]
    fn test_current_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }
}
