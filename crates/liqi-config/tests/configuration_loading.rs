//! Behavioural coverage for layered configuration loading.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use liqi_config::{
    Config, DEFAULT_ORIGIN, ENV_CONNECT_TIMEOUT_SECS, ENV_ENDPOINT, GatewayEndpoint,
    default_log_filter, default_log_format,
};

/// Serialises scenarios that mutate the process environment.
static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _env_guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let env_guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            cli_args: RefCell::new(vec![OsString::from("liqi")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _env_guard: env_guard,
        }
    }

    fn write_config(&self, endpoint: &GatewayEndpoint) {
        let path = self.temp_dir.path().join("liqi.toml");
        let document = format!("endpoint = \"{endpoint}\"\n");
        if let Err(error) = fs::write(&path, document) {
            panic!("failed to write configuration: {error}");
        }
        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Restored in `Drop`; the harness holds `ENV_MUTEX` for its lifetime.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Config::resolve_from_iter(args) {
            Ok(config) => *self.loaded.borrow_mut() = Some(config),
            Err(error) => *self.error.borrow_mut() = Some(error.to_string()),
        }
    }

    fn loaded_config(&self) -> Config {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        match self.loaded.borrow().as_ref() {
            Some(config) => config.clone(),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, previous)) = overrides.pop() {
            match previous {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn parse_endpoint(endpoint: &str) -> GatewayEndpoint {
    match endpoint.parse::<GatewayEndpoint>() {
        Ok(endpoint) => endpoint,
        Err(error) => panic!("invalid endpoint '{endpoint}': {error}"),
    }
}

#[given("a configuration file setting the endpoint to \"{endpoint}\"")]
fn given_configuration_file(harness: &Harness, endpoint: String) {
    harness.write_config(&parse_endpoint(&endpoint));
}

#[given("the environment overrides the endpoint to \"{endpoint}\"")]
fn given_environment_override(harness: &Harness, endpoint: String) {
    harness.set_env(ENV_ENDPOINT, &endpoint);
}

#[given("the environment sets the connect timeout to {secs} seconds")]
fn given_connect_timeout(harness: &Harness, secs: u64) {
    harness.set_env(ENV_CONNECT_TIMEOUT_SECS, &secs.to_string());
}

#[when("the command line sets the endpoint to \"{endpoint}\"")]
fn when_cli_override(harness: &Harness, endpoint: String) {
    harness.push_cli_arg("--endpoint");
    harness.push_cli_arg(endpoint);
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the endpoint to \"{endpoint}\"")]
fn then_resolved_endpoint(harness: &Harness, endpoint: String) {
    let config = harness.loaded_config();
    assert_eq!(config.endpoint(), Some(&parse_endpoint(&endpoint)));
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.loaded_config();

    assert!(config.endpoint().is_none());
    assert_eq!(config.origin(), DEFAULT_ORIGIN);
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
}

#[then("loading the configuration fails mentioning \"{fragment}\"")]
fn then_loading_fails(harness: &Harness, fragment: String) {
    harness.load();
    let error = harness.error.borrow();
    match error.as_ref() {
        Some(message) => assert!(
            message.contains(&fragment),
            "expected '{fragment}' in error: {message}"
        ),
        None => panic!("configuration loaded but an error was expected"),
    }
}

#[scenario(path = "tests/features/configuration_loading.feature")]
fn configuration_loading(#[from(harness)] harness: Harness) {
    let _ = harness;
}
