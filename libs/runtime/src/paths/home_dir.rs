use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("no home directory: {0} is not set")]
    MissingEnv(&'static str),
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const HOME_ENV: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const HOME_ENV: &str = "HOME";

/// Resolve the server home directory.
///
/// - `Some(path)`: `~` / `~/...` is expanded against the platform home; relative
///   paths are taken from the current directory.
/// - `None`: `<platform home>/<default_subdir>`, e.g. `$HOME/.rideshare`.
///
/// The result is absolute. With `create`, the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let resolved = match configured {
        Some(raw) => {
            let expanded = expand_tilde(raw.trim())?;
            if expanded.is_absolute() {
                expanded
            } else {
                env::current_dir()
                    .map_err(|source| HomeDirError::Create {
                        path: expanded.clone(),
                        source,
                    })?
                    .join(expanded)
            }
        }
        None => platform_home()?.join(default_subdir),
    };

    if create {
        std::fs::create_dir_all(&resolved).map_err(|source| HomeDirError::Create {
            path: resolved.clone(),
            source,
        })?;
    }
    Ok(resolved)
}

fn platform_home() -> Result<PathBuf, HomeDirError> {
    env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::MissingEnv(HOME_ENV))
}

fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Ok(platform_home()?.join(rest)),
        None => Ok(Path::new(raw).to_path_buf()),
    }
}
