//! Canned output for the simulated terminal. Only a handful of commands
//! are recognised; extend `simulate` to teach the terminal new ones.

pub const LS_OUTPUT: &str = "agent-controller.ts  app-state-store.ts  utils.ts  README.md";

pub const ANALYSIS_REPORT: &str = "Analyzing data...
Processing 1000 records...
Analysis complete:
- Average performance: 87.3%
- Peak efficiency: 95.2%
- Optimization potential: 12.7%";

pub const HELP_OUTPUT: &str = "Available commands:
  ls     - List directory contents
  pwd    - Print working directory
  cd     - Change directory
  echo   - Display text
  python - Run Python scripts
  help   - Show this help message";

pub const GENERIC_OUTPUT: &str = "Command executed successfully";

/// Output for `command`, run in `cwd`.
pub fn simulate(command: &str, cwd: &str) -> String {
    let command = command.trim();
    if let Some(rest) = command.strip_prefix("echo ") {
        return rest.to_string();
    }
    match command {
        "ls" => LS_OUTPUT.to_string(),
        "pwd" => cwd.to_string(),
        "help" => HELP_OUTPUT.to_string(),
        "python analyze_data.py" => ANALYSIS_REPORT.to_string(),
        "echo" => String::new(),
        c if c.starts_with("cd ") || c == "cd" => String::new(),
        _ => GENERIC_OUTPUT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_passes_text_through() {
        assert_eq!(simulate("echo hello", "~"), "hello");
        assert_eq!(simulate("echo  two  spaces", "~"), " two  spaces");
    }

    #[test]
    fn pwd_reports_cwd() {
        assert_eq!(simulate("pwd", "~/projects/emergent-labs"), "~/projects/emergent-labs");
    }

    #[test]
    fn unknown_is_generic() {
        assert_eq!(simulate("make deploy", "~"), GENERIC_OUTPUT);
        assert_eq!(simulate("cd src", "~"), "");
        assert!(simulate("python analyze_data.py", "~").starts_with("Analyzing data..."));
    }
}
