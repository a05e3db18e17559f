#![allow(dead_code)]

pub use kiosk_test_utils::builders::{CatalogEntryBuilder, TempCatalog, write_executable};
pub use kiosk_test_utils::fakes::{
    FakeProvisioner, FakeSupervisor, RecordingAudio, RecordingRenderer, ScriptedInput,
};
pub use kiosk_test_utils::{init_tracing, with_timeout};

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiosk::runtime::ResolverOptions;

/// Write a stand-in interpreter at `path`.
///
/// It answers the version probe with `version`, builds an environment by
/// copying itself to `<env>/bin/python`, exits `pip_exit` for `-m pip`, and
/// runs any `*.py` target by exiting 0 silently.
pub fn fake_python(path: &Path, version: &str, pip_exit: i32) -> PathBuf {
    let body = format!(
        r#"case "$1 $2" in
  "-c "*) echo {version} ;;
  "-m venv") mkdir -p "$3/bin" && cp "$0" "$3/bin/python" ;;
  "-m pip")
    echo "Collecting pygame"
    if [ {pip_exit} -ne 0 ]; then echo "ERROR: No matching distribution found" >&2; fi
    exit {pip_exit} ;;
  *.py*) exit 0 ;;
  *) exit 2 ;;
esac"#
    );
    write_executable(path, &body);
    path.to_path_buf()
}

/// Resolver options that only look at `bin` and at `locations`.
pub fn isolated_resolver(bin: &Path, locations: Vec<PathBuf>) -> ResolverOptions {
    ResolverOptions {
        probe_timeout: Duration::from_secs(5),
        install_timeout: Duration::from_secs(5),
        version_manager: None,
        launcher: None,
        common_locations: Some(locations),
        search_path: Some(bin.as_os_str().to_os_string()),
    }
}
