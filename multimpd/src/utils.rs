use reqwest::{
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Locate an executable. An explicit path wins when it exists, otherwise the
/// name is looked up in the working directory and then on `PATH`.
pub fn find_binary(name: &str, path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        if path.is_file() {
            return Some(path.to_owned());
        }

        return path.to_str().and_then(|x| find_binary(x, None));
    }

    let bin = if cfg!(target_os = "windows") && !name.ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_owned()
    };

    if Path::new(&bin).is_file() {
        return Some(PathBuf::from(bin));
    }

    env::split_paths(&env::var_os("PATH")?)
        .map(|x| x.join(&bin))
        .find(|x| x.is_file())
}

/// Parse a JSON object of request headers. Numbers and booleans are stringified.
pub fn parse_headers(s: &str) -> Result<HeaderMap, String> {
    let value = serde_json::from_str::<Value>(s)
        .map_err(|e| format!("headers are not valid json ({}).", e))?;

    let Value::Object(entries) = value else {
        return Err("headers must be a json object.".to_owned());
    };

    let mut headers = HeaderMap::new();

    for (name, value) in entries {
        let value = match value {
            Value::String(x) => x,
            Value::Number(x) => x.to_string(),
            Value::Bool(x) => x.to_string(),
            _ => return Err(format!("value of '{}' header must be a string.", name)),
        };

        headers.insert(
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name '{}'.", name))?,
            HeaderValue::from_str(&value)
                .map_err(|_| format!("invalid value for '{}' header.", name))?,
        );
    }

    Ok(headers)
}

pub fn http_url_parser(s: &str) -> Result<Url, String> {
    let url = s.trim().parse::<Url>().map_err(|e| e.to_string())?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        x => Err(format!("expected http(s) url but found '{}' scheme.", x)),
    }
}

pub fn format_bytes(bytesval: u64, precision: usize) -> String {
    let mut val = bytesval as f64;

    for unit in ["bytes", "KiB", "MiB", "GiB", "TiB"] {
        if val < 1024.0 {
            return format!("{:.precision$} {}", val, unit, precision = precision);
        }

        val /= 1024.0;
    }

    format!("{:.precision$} PiB", val, precision = precision)
}
