use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Interpreter-level view of the process environment.
///
/// The environment contains:
/// - `vars`: variables forwarded to external commands and consulted for `PATH` and `HOME`.
/// - `current_dir`: the working directory, kept in sync with the process by `cd`.
/// - `exit_request`: set by `exit`; the REPL stops once the current cycle has cleaned up.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub exit_request: Option<ExitCode>,
}

impl Environment {
    /// Capture the current process state.
    ///
    /// Variables whose name or value is not valid UTF-8 are left out.
    pub fn new() -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(key, val)| Some((key.into_string().ok()?, val.into_string().ok()?)))
            .collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir)
    }

    /// Build an environment from explicit parts, without reading the process state.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            exit_request: None,
        }
    }

    /// Get the value of a variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The colon-separated executable search path, empty when `PATH` is unset.
    pub fn search_path(&self) -> &str {
        self.get_var("PATH").unwrap_or("")
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        assert_eq!(env.search_path(), "");

        env.set_var("KEY", "VALUE");
        env.set_var("PATH", "/bin:/usr/bin");

        assert_eq!(env.get_var("KEY"), Some("VALUE"));
        assert_eq!(env.search_path(), "/bin:/usr/bin");
        assert_eq!(env.exit_request, None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }
}
